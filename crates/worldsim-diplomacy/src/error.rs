//! Error types for the diplomacy engine.
//!
//! Domain errors are returned to the caller of the specific operation. Score
//! mutations never error; they clamp.

use worldsim_types::{DiplomaticEventKind, FactionId};

/// Errors that can occur during diplomacy operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiplomacyError {
    /// A faction with this id is already registered.
    #[error("faction already registered: {0}")]
    DuplicateFaction(FactionId),

    /// No faction with this id is registered.
    #[error("unknown faction: {0}")]
    UnknownFaction(FactionId),

    /// A faction has no relation with itself.
    #[error("faction {0} has no relation with itself")]
    NoRelation(FactionId),

    /// A scripted event named fewer than two factions.
    #[error("{kind} requires two factions, got {provided}")]
    InsufficientFactions {
        /// The event that was triggered.
        kind: DiplomaticEventKind,
        /// How many factions were supplied.
        provided: usize,
    },
}
