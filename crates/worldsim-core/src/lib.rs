//! Configuration, tick orchestration, and event publishing for WorldSim.
//!
//! This crate ties the diplomacy engine and the crowd model together. A
//! single [`TickRunner`] owns the [`WorldSimulation`], turns each daily tick
//! into a batch of outbound events, and hands them to an [`EventSink`].
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration ([`WorldSimConfig`])
//! - [`tick`] -- One tick across both subsystems ([`WorldSimulation`], [`TickError`])
//! - [`sink`] -- Event publishing abstraction ([`EventSink`], [`MemorySink`])
//! - [`runner`] -- The inbound loop, commands, and retry ([`TickRunner`])

pub mod config;
pub mod runner;
pub mod sink;
pub mod tick;

pub use config::{ConfigError, WorldSimConfig};
pub use runner::{RunnerInput, RunnerStats, TickRunner, WorldCommand, offer_tick};
pub use sink::{EventSink, MemorySink, SinkError};
pub use tick::{
    CrowdModel, Subsystem, SubsystemFailure, TickError, TickReport, WorldSimulation,
};
