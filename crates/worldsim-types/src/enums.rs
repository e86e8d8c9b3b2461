//! Enumeration types for the WorldSim engine.
//!
//! Every kind that travels across a crate or wire boundary is a closed enum
//! so that `match` statements over it are checked for exhaustiveness.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Diplomacy
// ---------------------------------------------------------------------------

/// Discretized diplomatic classification of a faction pair.
///
/// Serialized with the upper-case names downstream consumers already use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiplomaticState {
    /// Open hostilities.
    War,
    /// Hostile but not fighting.
    ColdWar,
    /// Neutral coexistence. Initial state of every relation.
    Peace,
    /// Close cooperation.
    Alliance,
}

impl DiplomaticState {
    /// All states, in severity order.
    pub const ALL: [Self; 4] = [Self::War, Self::ColdWar, Self::Peace, Self::Alliance];

    /// The wire name of this state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::War => "WAR",
            Self::ColdWar => "COLD_WAR",
            Self::Peace => "PEACE",
            Self::Alliance => "ALLIANCE",
        }
    }

    /// Whether the state is considered newsworthy enough to be emitted as an
    /// individual change event.
    pub const fn is_extreme(self) -> bool {
        matches!(self, Self::War | Self::Alliance)
    }
}

impl core::fmt::Display for DiplomaticState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of formal agreement between two factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatyKind {
    /// Mutual defense pact.
    Alliance,
    /// Preferential trade terms.
    TradeAgreement,
    /// Promise not to attack.
    NonAggressionPact,
    /// Formal state of war (records the aggressor and defender).
    War,
}

impl TreatyKind {
    /// Love bonus this treaty contributes while active.
    pub const fn love_bonus(self) -> f64 {
        match self {
            Self::Alliance => 0.3,
            Self::TradeAgreement => 0.2,
            Self::NonAggressionPact => 0.1,
            Self::War => 0.0,
        }
    }
}

/// Scripted diplomatic event that immediately adjusts a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiplomaticEventKind {
    /// `factions = [attacker, defender]`.
    WarDeclaration,
    /// `factions = [a, b]`.
    AllianceFormed,
    /// `factions = [betrayer, betrayed]`.
    Betrayal,
}

impl DiplomaticEventKind {
    /// The wire name of this event kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WarDeclaration => "war_declaration",
            Self::AllianceFormed => "alliance_formed",
            Self::Betrayal => "betrayal",
        }
    }
}

impl core::fmt::Display for DiplomaticEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Crowd
// ---------------------------------------------------------------------------

/// Behavior a crowd agent performs during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Random step to a neighboring cell.
    Walk,
    /// Look for, or buy at, a food vendor.
    BuyFood,
    /// Post a social message.
    Tweet,
    /// Do nothing this step.
    #[default]
    Idle,
}

impl Behavior {
    /// The wire name of this behavior.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::BuyFood => "buy_food",
            Self::Tweet => "tweet",
            Self::Idle => "idle",
        }
    }
}

impl core::fmt::Display for Behavior {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a grid cell. Cells without an explicit type are streets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    /// Restaurant or street-food stall.
    FoodVendor,
    /// Bar, club, or other gathering place.
    SocialSpot,
    /// Everything else.
    #[default]
    Street,
}

/// Sub-type of an aggregated crowd summary signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Purchases of food during a step.
    FoodDemand,
    /// Most influential social post of a step.
    RumorSpread,
    /// High movement volume during a step.
    PopulationMovement,
}
