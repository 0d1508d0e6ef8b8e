//! PostgreSQL memory store.
//!
//! One row per user in `user_memory`; the mapping is stored as JSON text in
//! `last_context` and upserted on save. Rows that fail to decode load as an
//! empty mapping.
//!
//! Run the migration in `migrations/001_create_user_memory.sql` (or call
//! [`PostgresStore::migrate`]) before first use.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use prodops_core::error::StorageError;
use prodops_core::memory::{MemoryStore, UserMemory, decode_memory};

/// PostgreSQL-backed memory store.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Open a connection pool. The pool is shared with the other
    /// PostgreSQL-backed adapters via [`PostgresStore::pool`].
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Storage(format!("PostgreSQL connection failed: {e}")))?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the schema migration.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let migration_sql = include_str!("../migrations/001_create_user_memory.sql");

        sqlx::raw_sql(migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(format!("user_memory: {e}")))?;

        info!("Memory schema migration complete");
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for PostgresStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn load(&self, user_id: i64) -> Result<UserMemory, StorageError> {
        let raw: Option<Option<String>> =
            sqlx::query_scalar("SELECT last_context FROM user_memory WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::QueryFailed(format!("Failed to load memory: {e}")))?;

        Ok(decode_memory(raw.flatten().as_deref()))
    }

    async fn save(&self, user_id: i64, memory: &UserMemory) -> Result<(), StorageError> {
        let context = serde_json::to_string(memory)
            .map_err(|e| StorageError::Storage(format!("Failed to encode memory: {e}")))?;

        sqlx::query(
            "INSERT INTO user_memory (user_id, last_context) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET \
               last_context = EXCLUDED.last_context, \
               updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(&context)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("Failed to save memory: {e}")))?;

        debug!(user_id, "Saved user memory");
        Ok(())
    }
}
