//! Networked-relational backend (`PostgreSQL`).
//!
//! Same two-table layout as the embedded backend, on a database server.
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! to avoid requiring a live database at build time. All queries are
//! parameterized to prevent SQL injection.

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

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
    kind       TEXT   NOT NULL,
    id         TEXT   NOT NULL,
    position   BIGINT NOT NULL,
    generation BIGINT NOT NULL,
    body       TEXT   NOT NULL,
    PRIMARY KEY (kind, id)
)";

const UPSERT_META: &str = r"INSERT INTO world_meta (key, body) VALUES ($1, $2)
    ON CONFLICT (key) DO UPDATE SET body = EXCLUDED.body";

const UPSERT_ENTITY: &str = r"INSERT INTO entities (kind, id, position, generation, body)
    SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[], $3::BIGINT[], $4::BIGINT[], $5::TEXT[])
    ON CONFLICT (kind, id) DO UPDATE SET
        position = EXCLUDED.position,
        generation = EXCLUDED.generation,
        body = EXCLUDED.body";

/// World store on a `PostgreSQL` server.
///
/// Wraps a [`sqlx::PgPool`]. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect to `PostgreSQL` and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sql`] if the connection fails.
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    pub async fn connect(config: &PoolConfig) -> Result<Self, DbError> {
        let connect_options: PgConnectOptions = config
            .url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("Invalid database URL: {e}")))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await?;

        let repo = Self { pool };
        repo.ensure_schema().await?;
        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(repo)
    }

    /// Connect using a database URL string with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection fails.
    pub async fn connect_url(url: &str) -> Result<Self, DbError> {
        Self::connect(&PoolConfig::new(url)).await
    }

    async fn ensure_schema(&self) -> Result<(), DbError> {
        sqlx::query(CREATE_META).execute(&self.pool).await?;
        sqlx::query(CREATE_ENTITIES).execute(&self.pool).await?;
        Ok(())
    }

    /// Return a reference to the underlying [`PgPool`].
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }

    async fn write(&self, ctx: &PersistCtx, snapshot: &GameSnapshot) -> Result<(), DbError> {
        let encoded = rows::encode(snapshot)?;
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent savers on the counter row.
        let previous: Option<String> =
            sqlx::query_scalar("SELECT body FROM world_meta WHERE key = $1 FOR UPDATE")
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

        let count = encoded.entities.len();
        let mut kinds = Vec::with_capacity(count);
        let mut ids = Vec::with_capacity(count);
        let mut positions = Vec::with_capacity(count);
        let mut bodies = Vec::with_capacity(count);
        for row in encoded.entities {
            kinds.push(row.kind);
            ids.push(row.id);
            positions.push(row.position);
            bodies.push(row.body);
        }
        let generations = vec![generation; count];
        sqlx::query(UPSERT_ENTITY)
            .bind(&kinds)
            .bind(&ids)
            .bind(&positions)
            .bind(&generations)
            .bind(&bodies)
            .execute(&mut *tx)
            .await?;

        let stale = sqlx::query("DELETE FROM entities WHERE generation <> $1")
            .bind(generation)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        ctx.check()?;
        tx.commit().await?;
        tracing::debug!(
            generation,
            rows = count,
            stale,
            tick = snapshot.meta.tick,
            "Saved world to PostgreSQL"
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

impl Repository for PostgresRepository {
    async fn save(&self, ctx: &PersistCtx, snapshot: &GameSnapshot) -> Result<(), DbError> {
        ctx.run(self.write(ctx, snapshot)).await
    }

    async fn load(&self, ctx: &PersistCtx) -> Result<Option<GameSnapshot>, DbError> {
        ctx.run(self.read()).await
    }
}
