//! Notification audit logs.

use async_trait::async_trait;
use prodops_core::error::StorageError;
use prodops_core::{NotificationAuditLog, NotificationOutcome};
use std::sync::Mutex;

/// Keeps outcomes in memory. Used when no database is configured.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: Mutex<Vec<NotificationOutcome>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<NotificationOutcome> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NotificationAuditLog for InMemoryAuditLog {
    async fn record(&self, outcome: &NotificationOutcome) -> Result<(), StorageError> {
        self.records
            .lock()
            .map_err(|e| StorageError::Storage(e.to_string()))?
            .push(outcome.clone());
        Ok(())
    }
}

#[cfg(feature = "postgres")]
pub use pg::PgAuditLog;

#[cfg(feature = "postgres")]
mod pg {
    use super::*;
    use sqlx::postgres::PgPool;
    use tracing::info;

    /// Appends to `notification_logs`. The `recipient` column holds the
    /// per-channel delivery summary.
    pub struct PgAuditLog {
        pool: PgPool,
    }

    impl PgAuditLog {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        pub async fn migrate(&self) -> Result<(), StorageError> {
            let migration_sql = include_str!("../migrations/001_create_notification_logs.sql");

            sqlx::raw_sql(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::MigrationFailed(format!("notification_logs: {e}")))?;

            info!("Notification log schema migration complete");
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationAuditLog for PgAuditLog {
        async fn record(&self, outcome: &NotificationOutcome) -> Result<(), StorageError> {
            sqlx::query(
                "INSERT INTO notification_logs (ticket_id, channel, recipient, status) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(outcome.ticket_id)
            .bind(&outcome.channel)
            .bind(&outcome.recipient_summary)
            .bind(outcome.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("Failed to write notification log: {e}")))?;
            Ok(())
        }
    }
}
