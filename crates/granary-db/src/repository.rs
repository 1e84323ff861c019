//! The persistence boundary.
//!
//! A [`Repository`] stores and retrieves whole [`GameSnapshot`]s. Saves are
//! idempotent upserts keyed by `(kind, natural id)`; rows absent from the
//! saved snapshot are deleted in the same transaction, so a load reproduces
//! the saved collections exactly.

use std::future::Future;

use tracing::info;

use granary_core::config::{StorageConfig, StorageDialect};
use granary_core::{Game, GameSnapshot};

use crate::ctx::PersistCtx;
use crate::error::DbError;
use crate::pool::PoolConfig;
use crate::postgres::PostgresRepository;
use crate::sqlite::SqliteRepository;

/// A durable home for the world.
pub trait Repository {
    /// Persist a snapshot, replacing whatever was stored before.
    ///
    /// A failed or cancelled save leaves the previous contents in place.
    fn save(
        &self,
        ctx: &PersistCtx,
        snapshot: &GameSnapshot,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Read the stored snapshot, or `None` if nothing has been saved.
    fn load(
        &self,
        ctx: &PersistCtx,
    ) -> impl Future<Output = Result<Option<GameSnapshot>, DbError>> + Send;
}

/// Load the stored world into `game`. Returns whether anything was loaded.
///
/// The snapshot is fully read and decoded before the world is touched, and
/// the aggregate checks it before applying, so a failure never mutates.
///
/// # Errors
///
/// Returns [`DbError`] if the read fails or the snapshot is rejected.
pub async fn load_into<R: Repository + Sync>(
    repo: &R,
    ctx: &PersistCtx,
    game: &Game,
) -> Result<bool, DbError> {
    let Some(snapshot) = repo.load(ctx).await? else {
        info!("No saved world found; starting fresh");
        return Ok(false);
    };
    ctx.check()?;
    game.restore(snapshot).await?;
    Ok(true)
}

/// The backend selected by configuration.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// Embedded `SQLite` file.
    Sqlite(SqliteRepository),
    /// `PostgreSQL` server.
    Postgres(PostgresRepository),
}

impl StorageBackend {
    /// Open the backend named by the `storage` section.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the networked dialect has no URL, and
    /// [`DbError::Sql`] if the connection fails.
    pub async fn connect(storage: &StorageConfig) -> Result<Self, DbError> {
        let pool = PoolConfig::from_storage(storage);
        match storage.dialect {
            StorageDialect::EmbeddedFile => Ok(Self::Sqlite(SqliteRepository::connect(&pool).await?)),
            StorageDialect::NetworkedRelational => {
                if storage.url.as_deref().is_none_or(str::is_empty) {
                    return Err(DbError::Config(
                        "storage.url is required for the networked_relational dialect".to_owned(),
                    ));
                }
                Ok(Self::Postgres(PostgresRepository::connect(&pool).await?))
            }
        }
    }

    /// Human-readable backend name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        match self {
            Self::Sqlite(repo) => repo.close().await,
            Self::Postgres(repo) => repo.close().await,
        }
    }
}

impl Repository for StorageBackend {
    async fn save(&self, ctx: &PersistCtx, snapshot: &GameSnapshot) -> Result<(), DbError> {
        match self {
            Self::Sqlite(repo) => repo.save(ctx, snapshot).await,
            Self::Postgres(repo) => repo.save(ctx, snapshot).await,
        }
    }

    async fn load(&self, ctx: &PersistCtx) -> Result<Option<GameSnapshot>, DbError> {
        match self {
            Self::Sqlite(repo) => repo.load(ctx).await,
            Self::Postgres(repo) => repo.load(ctx).await,
        }
    }
}
