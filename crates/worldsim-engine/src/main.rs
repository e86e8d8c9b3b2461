//! WorldSim engine binary.
//!
//! Wires the diplomacy engine and the crowd model to NATS. Daily ticks
//! arrive from an external scheduler, each tick runs both subsystems, and
//! the resulting events are published back out.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `worldsim-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the world from configuration
//! 4. Connect to NATS and subscribe to ticks and commands
//! 5. Run the tick runner until Ctrl-C
//! 6. Log the result

mod error;
mod nats;

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worldsim_core::config::LoggingConfig;
use worldsim_core::{CrowdModel, TickRunner, WorldSimConfig, WorldSimulation};

use crate::error::EngineError;
use crate::nats::NatsEventSink;

/// Config file read when no path is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "worldsim-config.yaml";

/// Application entry point for the WorldSim engine.
///
/// # Errors
///
/// Returns an error if configuration, world setup, or NATS setup fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        seed = config.world.seed,
        factions = config.diplomacy.factions.len(),
        crowd_enabled = config.crowd.enabled,
        parallel = config.orchestrator.parallel_subsystems,
        "worldsim-engine starting"
    );

    // 3. Build the world.
    let world = WorldSimulation::from_config(&config).map_err(EngineError::from)?;
    info!(
        factions = world.diplomacy.faction_count(),
        agents = world.crowd.as_deref().map_or(0, CrowdModel::population),
        "World initialized"
    );

    // 4. Connect to NATS and wire subscriptions into the runner queue.
    let infra = config.infrastructure.clone();
    let client = nats::connect(&infra.nats_url).await?;
    let (tx, rx) = mpsc::channel(config.orchestrator.tick_queue_capacity);

    let ticks = nats::subscribe(&client, &infra.tick_subject).await?;
    let commands = nats::subscribe(&client, &infra.command_subject).await?;
    let tick_task = nats::spawn_tick_listener(ticks, tx.clone());
    let command_task = nats::spawn_command_listener(commands, tx);

    // 5. Run until Ctrl-C.
    let sink = NatsEventSink::new(client, infra);
    let runner = TickRunner::new(world, sink, config.orchestrator.max_pending_events);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let runner = runner.run(rx, shutdown).await;

    tick_task.abort();
    command_task.abort();

    // 6. Log the result.
    let stats = runner.stats();
    info!(
        ticks = stats.ticks,
        commands_applied = stats.commands_applied,
        commands_rejected = stats.commands_rejected,
        events_published = stats.events_published,
        events_dropped = stats.events_dropped,
        events_pending = runner.pending().len(),
        "worldsim-engine stopped"
    );

    Ok(())
}

/// Load and validate configuration.
///
/// A missing file is not an error: defaults are used, with `NATS_URL`
/// still honored.
fn load_config() -> Result<WorldSimConfig, EngineError> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = WorldSimConfig::load_or_default(&path)?;
    config.validate()?;
    Ok(config)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
