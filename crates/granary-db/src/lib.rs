//! Persistence boundary for the Granary world (`SQLite` + `PostgreSQL`).
//!
//! The engine keeps the whole world in memory. This crate writes snapshots
//! of it to a durable store and reads them back on startup.
//!
//! # Architecture
//!
//! ```text
//! Game (in memory)
//!     |
//!     +-- snapshot under lock --> Repository::save(ctx, &snapshot)
//!     |                               |-- SqliteRepository   (embedded file)
//!     |                               +-- PostgresRepository (server)
//!     |
//!     +-- load_into(repo, ctx, &game) <-- Repository::load(ctx)
//! ```
//!
//! # Modules
//!
//! - [`repository`] -- The [`Repository`] trait, backend selection, and `load_into`
//! - [`sqlite`] -- Embedded-file backend
//! - [`postgres`] -- Networked-relational backend
//! - [`rows`] -- Row layout shared by both backends
//! - [`ctx`] -- Deadline and cancellation for persistence calls
//! - [`pool`] -- Connection pool settings
//! - [`error`] -- Shared error types

pub mod ctx;
pub mod error;
pub mod pool;
pub mod postgres;
pub mod repository;
pub mod rows;
pub mod sqlite;

// Re-export primary types for convenience.
pub use ctx::PersistCtx;
pub use error::DbError;
pub use pool::PoolConfig;
pub use postgres::PostgresRepository;
pub use repository::{Repository, StorageBackend, load_into};
pub use sqlite::SqliteRepository;
