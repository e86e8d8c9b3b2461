//! Type-safe identifier wrappers.
//!
//! Factions are keyed by a stable string chosen by the game platform; crowd
//! agents are numbered sequentially when the world model is built. Wrapping
//! both prevents a faction key from being passed where an agent id is
//! expected (and vice versa) at compile time.

use serde::{Deserialize, Serialize};

/// Unique, stable identifier for a faction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactionId(pub String);

impl FactionId {
    /// Create a faction identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for FactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for FactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Unique identifier for a crowd agent, stable for the agent's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl AgentId {
    /// Return the raw numeric value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AgentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Canonical key for an unordered faction pair.
///
/// The two ids are stored in sorted order so that `(a, b)` and `(b, a)`
/// produce the same key. Every relation lookup goes through this key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    low: FactionId,
    high: FactionId,
}

impl PairKey {
    /// Build the canonical key for two faction ids in either order.
    pub fn new(a: &FactionId, b: &FactionId) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }

    /// The lexically smaller faction id.
    pub const fn low(&self) -> &FactionId {
        &self.low
    }

    /// The lexically larger faction id.
    pub const fn high(&self) -> &FactionId {
        &self.high
    }

    /// Whether the given faction is one side of this pair.
    pub fn contains(&self, id: &FactionId) -> bool {
        &self.low == id || &self.high == id
    }
}

impl core::fmt::Display for PairKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}_{}", self.low, self.high)
    }
}
