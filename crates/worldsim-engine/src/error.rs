//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and message handling.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: worldsim_core::ConfigError,
    },

    /// The world could not be built from configuration.
    #[error("world build error: {source}")]
    Build {
        /// The underlying tick error.
        #[from]
        source: worldsim_core::TickError,
    },

    /// NATS connection or messaging failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// An inbound message could not be decoded.
    #[error("malformed message on {subject}: {message}")]
    Malformed {
        /// Subject the message arrived on.
        subject: String,
        /// Description of the decode failure.
        message: String,
    },
}
