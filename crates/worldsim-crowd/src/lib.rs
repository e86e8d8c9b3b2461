//! Background crowd simulation for the WorldSim engine.
//!
//! A small agent-based model: inhabitants wander a city grid, get hungry,
//! buy food, and post rumors. The raw activity of each step is folded into
//! a handful of summary signals the rest of the world can react to.
//!
//! # Modules
//!
//! - [`agent`] -- Per-inhabitant state and behavior ([`CrowdAgent`])
//! - [`error`] -- Error types for model construction ([`CrowdError`])
//! - [`grid`] -- Bounded grid and location typing ([`CityGrid`])
//! - [`model`] -- The stepped world ([`WorldModel`])
//! - [`signal`] -- Raw signals, summaries, and step statistics

pub mod agent;
pub mod error;
pub mod grid;
pub mod model;
pub mod signal;

pub use agent::CrowdAgent;
pub use error::CrowdError;
pub use grid::CityGrid;
pub use model::WorldModel;
pub use signal::{RawSignal, StepStats, SummarySignal, aggregate};
