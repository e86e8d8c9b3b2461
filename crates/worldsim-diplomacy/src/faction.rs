//! Per-faction power attributes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use worldsim_types::FactionId;

/// Weight of military power in the total power score.
pub const MILITARY_WEIGHT: f64 = 0.40;
/// Weight of economic strength in the total power score.
pub const ECONOMIC_WEIGHT: f64 = 0.25;
/// Weight of territory size in the total power score.
pub const TERRITORY_WEIGHT: f64 = 0.15;
/// Weight of technology level in the total power score.
pub const TECHNOLOGY_WEIGHT: f64 = 0.15;
/// Weight of morale in the total power score.
pub const MORALE_WEIGHT: f64 = 0.05;

/// Power attributes of a single faction.
///
/// Created once at registration. Attributes are adjusted by external game
/// events through [`update_power`](Self::update_power) and friends; the
/// diplomacy engine itself only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionState {
    /// Stable faction key.
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Military strength.
    pub military_power: f64,
    /// Economic strength.
    pub economic_strength: f64,
    /// Territory size.
    pub territory_size: f64,
    /// Technology level.
    pub technology_level: f64,
    /// Morale in `[0.0, 1.0]`.
    morale: f64,
    /// Resource inventory: resource kind to quantity.
    pub resources: BTreeMap<String, u64>,
    /// When any attribute was last changed.
    pub last_updated: DateTime<Utc>,
}

impl FactionState {
    /// Create a faction with the given military power. An empty name falls
    /// back to the id. Morale starts at full.
    pub fn new(id: FactionId, military_power: f64, name: &str) -> Self {
        let name = if name.is_empty() {
            id.to_string()
        } else {
            name.to_owned()
        };
        Self {
            id,
            name,
            military_power: military_power.max(0.0),
            economic_strength: 0.0,
            territory_size: 0.0,
            technology_level: 0.0,
            morale: 1.0,
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Current morale.
    pub const fn morale(&self) -> f64 {
        self.morale
    }

    /// Set military power, floored at zero.
    pub fn update_power(&mut self, new_power: f64) {
        self.military_power = new_power.max(0.0);
        self.last_updated = Utc::now();
    }

    /// Set morale, clamped to `[0.0, 1.0]`.
    pub fn set_morale(&mut self, morale: f64) {
        self.morale = morale.clamp(0.0, 1.0);
        self.last_updated = Utc::now();
    }

    /// Weighted combination of every power attribute.
    pub fn total_power_score(&self) -> f64 {
        self.military_power * MILITARY_WEIGHT
            + self.economic_strength * ECONOMIC_WEIGHT
            + self.territory_size * TERRITORY_WEIGHT
            + self.technology_level * TECHNOLOGY_WEIGHT
            + self.morale * MORALE_WEIGHT
    }
}
