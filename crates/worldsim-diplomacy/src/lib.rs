//! Faction diplomacy for the WorldSim engine.
//!
//! Factions hold power attributes; every unordered pair of factions shares
//! one relation scored on three axes (love, fear, trust). Periodic
//! evaluation folds those scores, active treaties, power asymmetry, and a
//! small amount of noise into one of four diplomatic states.
//!
//! # Modules
//!
//! - [`engine`] -- Registry, evaluation, scripted events, drift ([`DiplomacyEngine`])
//! - [`error`] -- Error types for diplomacy operations ([`DiplomacyError`])
//! - [`faction`] -- Per-faction power attributes ([`FactionState`])
//! - [`noise`] -- Injectable score perturbation ([`NoiseSource`])
//! - [`relation`] -- Per-pair scores, treaties, and history ([`DiplomaticRelation`])

pub mod engine;
pub mod error;
pub mod faction;
pub mod noise;
pub mod relation;

pub use engine::{
    DiplomacyEngine, EventImpact, GlobalEventRecord, StateChangeRecord, diplomatic_score,
    fear_factor, score_to_state,
};
pub use error::DiplomacyError;
pub use faction::FactionState;
pub use noise::{DEFAULT_NOISE_AMPLITUDE, FixedNoise, NoNoise, NoiseSource, UniformNoise};
pub use relation::{DiplomaticRelation, HISTORY_LIMIT, InteractionRecord, Treaty};
