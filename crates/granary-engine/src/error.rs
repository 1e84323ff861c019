//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of engine startup and the
//! background loop so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: granary_core::config::ConfigError,
    },

    /// The world could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying core error.
        #[from]
        source: granary_core::CoreError,
    },

    /// The persistence backend failed.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying persistence error.
        #[from]
        source: granary_db::DbError,
    },

    /// Logging could not be initialized.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
