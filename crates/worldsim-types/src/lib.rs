//! Shared type definitions for the WorldSim world-simulation engine.
//!
//! This crate is the single source of truth for identifiers, enumerations,
//! and wire envelopes shared by the diplomacy engine, the crowd model, the
//! tick orchestrator, and the engine binary.
//!
//! # Modules
//!
//! - [`ids`] -- Strongly-typed faction and agent identifiers, canonical pair keys
//! - [`enums`] -- Diplomatic states, treaty kinds, event kinds, behaviors, locations
//! - [`grid`] -- Grid coordinates for the crowd model
//! - [`events`] -- Inbound tick triggers and outbound event envelopes

pub mod enums;
pub mod events;
pub mod grid;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Behavior, DiplomaticEventKind, DiplomaticState, LocationType, SignalType, TreatyKind,
};
pub use events::{DiplomacySummary, EventPayload, OutboundEvent, TickId, TickTrigger};
pub use grid::GridPos;
pub use ids::{AgentId, FactionId, PairKey};
