//! Error types for the granary-core crate.
//!
//! Gameplay never fails with an error: handlers report refusals through
//! [`ActionOutcome`](crate::state::ActionOutcome). The variants here cover
//! building and restoring the aggregate itself.

/// Errors that can occur while constructing or restoring the world.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// The world clock rejected its parameters.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: crate::clock::ClockError,
    },

    /// A snapshot could not be applied to the aggregate.
    #[error("snapshot rejected: {reason}")]
    Snapshot {
        /// What made the snapshot unusable.
        reason: String,
    },
}
