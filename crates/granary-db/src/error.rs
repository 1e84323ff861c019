//! Error types for the persistence boundary.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`serde_json`] errors with context about which stage of a
//! save or load failed.

use granary_core::CoreError;

/// Errors that can occur while saving or loading the world.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    /// A row body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored rows do not describe a world this build understands.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// What was found instead of what was expected.
        reason: String,
    },

    /// The loaded snapshot was rejected by the aggregate.
    #[error("snapshot rejected: {0}")]
    Restore(#[from] CoreError),

    /// The operation was cancelled before it finished.
    #[error("persistence cancelled")]
    Cancelled,

    /// The operation ran past its deadline.
    #[error("persistence deadline exceeded")]
    DeadlineExceeded,

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
