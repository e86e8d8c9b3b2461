//! Configuration loading and typed config structures for WorldSim.
//!
//! The canonical configuration lives in `worldsim-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so a missing file or an empty document yields
//! a runnable configuration.

use std::path::Path;

use serde::Deserialize;
use tokio::sync::Semaphore;
use worldsim_diplomacy::DEFAULT_NOISE_AMPLITUDE;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but cannot be run.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Which constraint was violated.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level WorldSim configuration.
///
/// Mirrors the structure of `worldsim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorldSimConfig {
    /// World-level settings.
    #[serde(default)]
    pub world: WorldConfig,

    /// Crowd model settings.
    #[serde(default)]
    pub crowd: CrowdConfig,

    /// Diplomacy settings and the starting faction roster.
    #[serde(default)]
    pub diplomacy: DiplomacyConfig,

    /// Tick orchestration settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Messaging connection and subjects.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WorldSimConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `NATS_URL` overrides `infrastructure.nats_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crowd.grid_width == 0 || self.crowd.grid_height == 0 {
            return Err(invalid(format!(
                "crowd grid must be at least 1x1, got {}x{}",
                self.crowd.grid_width, self.crowd.grid_height
            )));
        }
        if self.crowd.enabled && self.crowd.initial_agents == 0 {
            return Err(invalid(
                "crowd.initial_agents must be positive when the crowd is enabled",
            ));
        }
        if self.orchestrator.tick_queue_capacity == 0 {
            return Err(invalid("orchestrator.tick_queue_capacity must be positive"));
        }
        if self.orchestrator.tick_queue_capacity > Semaphore::MAX_PERMITS {
            return Err(invalid(format!(
                "orchestrator.tick_queue_capacity must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.orchestrator.max_pending_events == 0 {
            return Err(invalid("orchestrator.max_pending_events must be positive"));
        }
        if !self.diplomacy.noise_amplitude.is_finite() || self.diplomacy.noise_amplitude < 0.0 {
            return Err(invalid("diplomacy.noise_amplitude must be a non-negative number"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Random seed for the crowd model and diplomatic noise.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

/// Crowd model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrowdConfig {
    /// Whether the crowd model runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Grid width in cells.
    #[serde(default = "default_grid_size")]
    pub grid_width: u32,

    /// Grid height in cells.
    #[serde(default = "default_grid_size")]
    pub grid_height: u32,

    /// Agents spawned at startup.
    #[serde(default = "default_initial_agents")]
    pub initial_agents: u64,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_width: default_grid_size(),
            grid_height: default_grid_size(),
            initial_agents: default_initial_agents(),
        }
    }
}

/// Diplomacy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiplomacyConfig {
    /// Half-width of the uniform noise added to every evaluation.
    #[serde(default = "default_noise_amplitude")]
    pub noise_amplitude: f64,

    /// Factions registered at startup, in order.
    #[serde(default)]
    pub factions: Vec<FactionSeed>,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            noise_amplitude: default_noise_amplitude(),
            factions: Vec::new(),
        }
    }
}

/// One faction of the starting roster.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FactionSeed {
    /// Stable faction key.
    pub id: String,

    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: String,

    /// Military strength.
    #[serde(default)]
    pub military_power: f64,

    /// Economic strength.
    #[serde(default)]
    pub economic_strength: f64,

    /// Territory size.
    #[serde(default)]
    pub territory_size: f64,

    /// Technology level.
    #[serde(default)]
    pub technology_level: f64,
}

/// Tick orchestration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrchestratorConfig {
    /// Run diplomacy and crowd on separate worker threads within a tick.
    #[serde(default = "default_true")]
    pub parallel_subsystems: bool,

    /// Tick triggers buffered ahead of the runner; overflow is dropped.
    #[serde(default = "default_tick_queue_capacity")]
    pub tick_queue_capacity: usize,

    /// Unpublished events retained for retry; oldest dropped beyond this.
    #[serde(default = "default_max_pending_events")]
    pub max_pending_events: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel_subsystems: true,
            tick_queue_capacity: default_tick_queue_capacity(),
            max_pending_events: default_max_pending_events(),
        }
    }
}

/// Messaging connection and subjects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject carrying daily tick triggers.
    #[serde(default = "default_tick_subject")]
    pub tick_subject: String,

    /// Subject carrying world commands.
    #[serde(default = "default_command_subject")]
    pub command_subject: String,

    /// Prefix of outbound event subjects; the event type is appended.
    #[serde(default = "default_event_subject_prefix")]
    pub event_subject_prefix: String,
}

impl InfrastructureConfig {
    /// Override the NATS URL with the `NATS_URL` environment variable when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
    }

    /// Subject an event of `event_type` is published on.
    pub fn event_subject(&self, event_type: &str) -> String {
        format!("{}.{event_type}", self.event_subject_prefix)
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            tick_subject: default_tick_subject(),
            command_subject: default_command_subject(),
            event_subject_prefix: default_event_subject_prefix(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_seed() -> u64 {
    42
}

const fn default_grid_size() -> u32 {
    50
}

const fn default_initial_agents() -> u64 {
    100
}

const fn default_noise_amplitude() -> f64 {
    DEFAULT_NOISE_AMPLITUDE
}

const fn default_tick_queue_capacity() -> usize {
    16
}

const fn default_max_pending_events() -> usize {
    1_000
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_tick_subject() -> String {
    "world.tick.daily".to_owned()
}

fn default_command_subject() -> String {
    "world.commands".to_owned()
}

fn default_event_subject_prefix() -> String {
    "world.events".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
