//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and shutdown.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `run` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: egol_core::config::ConfigError,
    },

    /// Frame clock initialization failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: egol_core::clock::ClockError,
    },

    /// The tick loop ended with an error.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: egol_core::runner::RunnerError,
    },

    /// Connecting to Redis failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: egol_db::DbError,
    },

    /// The HTTP server failed to start or crashed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: egol_server::ServerError,
    },

    /// The tick loop task panicked or was cancelled.
    #[error("tick loop task failed: {message}")]
    TickLoop {
        /// Description of the task failure.
        message: String,
    },
}
