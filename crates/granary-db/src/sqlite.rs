//! Embedded-file backend (`SQLite`).
//!
//! The whole world lives in one database file. Uses [`sqlx`] with runtime
//! query construction, so no database is needed at build time. All queries
//! are parameterized.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use granary_core::GameSnapshot;

use crate::ctx::PersistCtx;
use crate::error::DbError;
use crate::pool::PoolConfig;
use crate::repository::Repository;
use crate::rows::{self, EntityRow, MetaRow, key};

const CREATE_META: &str = r"CREATE TABLE IF NOT EXISTS world_meta (
    key  TEXT PRIMARY KEY,
    body TEXT NOT NULL
)";

const CREATE_ENTITIES: &str = r"CREATE TABLE IF NOT EXISTS entities (
    kind       TEXT    NOT NULL,
    id         TEXT    NOT NULL,
    position   INTEGER NOT NULL,
    generation INTEGER NOT NULL,
    body       TEXT    NOT NULL,
    PRIMARY KEY (kind, id)
)";

const UPSERT_META: &str = r"INSERT INTO world_meta (key, body) VALUES ($1, $2)
    ON CONFLICT (key) DO UPDATE SET body = excluded.body";

const UPSERT_ENTITY: &str = r"INSERT INTO entities (kind, id, position, generation, body)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (kind, id) DO UPDATE SET
        position = excluded.position,
        generation = excluded.generation,
        body = excluded.body";

/// World store in a single `SQLite` file.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (creating if missing) the database and ensure the schema.
    ///
    /// Idle connections are never reaped, so `sqlite::memory:` with one
    /// connection keeps its data for the life of the pool.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed and
    /// [`DbError::Sql`] if the connection or schema setup fails.
    pub async fn connect(config: &PoolConfig) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::Config(format!("Invalid database URL: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.ensure_schema().await?;
        tracing::info!(
            url = %config.url,
            max_connections = config.max_connections,
            "Opened SQLite store"
        );
        Ok(repo)
    }

    /// Wrap an existing pool and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sql`] if the schema cannot be created.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DbError> {
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), DbError> {
        sqlx::query(CREATE_META).execute(&self.pool).await?;
        sqlx::query(CREATE_ENTITIES).execute(&self.pool).await?;
        Ok(())
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }

    async fn write(&self, ctx: &PersistCtx, snapshot: &GameSnapshot) -> Result<(), DbError> {
        let encoded = rows::encode(snapshot)?;
        let mut tx = self.pool.begin().await?;

        let previous: Option<String> =
            sqlx::query_scalar("SELECT body FROM world_meta WHERE key = $1")
                .bind(key::GENERATION)
                .fetch_optional(&mut *tx)
                .await?;
        let generation = rows::generation_of(previous.as_deref()).saturating_add(1);

        for (name, body) in &encoded.meta {
            sqlx::query(UPSERT_META)
                .bind(*name)
                .bind(body)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(UPSERT_META)
            .bind(key::GENERATION)
            .bind(generation.to_string())
            .execute(&mut *tx)
            .await?;

        for row in &encoded.entities {
            sqlx::query(UPSERT_ENTITY)
                .bind(&row.kind)
                .bind(&row.id)
                .bind(row.position)
                .bind(generation)
                .bind(&row.body)
                .execute(&mut *tx)
                .await?;
        }
        let stale = sqlx::query("DELETE FROM entities WHERE generation <> $1")
            .bind(generation)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        ctx.check()?;
        tx.commit().await?;
        tracing::debug!(
            generation,
            rows = encoded.entities.len(),
            stale,
            tick = snapshot.meta.tick,
            "Saved world to SQLite"
        );
        Ok(())
    }

    async fn read(&self) -> Result<Option<GameSnapshot>, DbError> {
        let meta = sqlx::query_as::<_, MetaRow>("SELECT key, body FROM world_meta")
            .fetch_all(&self.pool)
            .await?;
        let entities = sqlx::query_as::<_, EntityRow>(
            "SELECT kind, id, position, body FROM entities ORDER BY kind, position",
        )
        .fetch_all(&self.pool)
        .await?;
        rows::decode(&meta, entities)
    }
}

impl Repository for SqliteRepository {
    async fn save(&self, ctx: &PersistCtx, snapshot: &GameSnapshot) -> Result<(), DbError> {
        ctx.run(self.write(ctx, snapshot)).await
    }

    async fn load(&self, ctx: &PersistCtx) -> Result<Option<GameSnapshot>, DbError> {
        ctx.run(self.read()).await
    }
}
