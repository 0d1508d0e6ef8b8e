//! Production and downtime lookups over the plant's PostgreSQL schema.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use sqlx::postgres::PgPool;
use tracing::debug;

use prodops_core::error::CapabilityError;
use prodops_core::{DowntimeEntry, DowntimeLookup, ProductionLookup, ProductionSummary};

use crate::query_failed;

const PRODUCTION: &str = "production_lookup";
const DOWNTIME: &str = "downtime_lookup";

/// Daily good/reject totals from `production_log`.
pub struct PgProductionLookup {
    pool: PgPool,
}

impl PgProductionLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductionLookup for PgProductionLookup {
    async fn production_summary(
        &self,
        line_code: &str,
        date: NaiveDate,
    ) -> Result<Option<ProductionSummary>, CapabilityError> {
        debug!(line_code, %date, "Production lookup");

        let row = sqlx::query(
            "SELECT pl.line_code, \
                    DATE(p.event_time) AS production_date, \
                    SUM(p.quantity_good)::BIGINT AS total_good, \
                    SUM(p.quantity_reject)::BIGINT AS total_reject \
             FROM production_log p \
             JOIN production_lines pl ON p.line_id = pl.id \
             WHERE pl.line_code = $1 AND DATE(p.event_time) = $2 \
             GROUP BY pl.line_code, DATE(p.event_time)",
        )
        .bind(line_code)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed(PRODUCTION, e))?;

        row.map(|row| -> Result<ProductionSummary, sqlx::Error> {
            Ok(ProductionSummary {
                line_code: row.try_get("line_code")?,
                production_date: row.try_get("production_date")?,
                total_good: row.try_get::<Option<i64>, _>("total_good")?.unwrap_or(0),
                total_reject: row.try_get::<Option<i64>, _>("total_reject")?.unwrap_or(0),
            })
        })
        .transpose()
        .map_err(|e| CapabilityError::invalid_response(PRODUCTION, e.to_string()))
    }
}

/// Downtime grouped by reason from `downtime_log`, longest first.
pub struct PgDowntimeLookup {
    pool: PgPool,
}

impl PgDowntimeLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DowntimeLookup for PgDowntimeLookup {
    async fn downtime_summary(
        &self,
        line_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<DowntimeEntry>, CapabilityError> {
        debug!(line_code, %date, "Downtime lookup");

        let rows = sqlx::query(
            "SELECT d.reason_code, \
                    d.reason_text, \
                    (SUM(EXTRACT(EPOCH FROM (d.end_time - d.start_time)) / 60))::FLOAT8 \
                        AS downtime_minutes \
             FROM downtime_log d \
             JOIN production_lines pl ON d.line_id = pl.id \
             WHERE pl.line_code = $1 AND DATE(d.start_time) = $2 \
             GROUP BY d.reason_code, d.reason_text \
             ORDER BY downtime_minutes DESC",
        )
        .bind(line_code)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed(DOWNTIME, e))?;

        rows.iter()
            .map(|row| -> Result<DowntimeEntry, sqlx::Error> {
                Ok(DowntimeEntry {
                    reason_code: row.try_get("reason_code")?,
                    reason_text: row.try_get("reason_text")?,
                    downtime_minutes: row
                        .try_get::<Option<f64>, _>("downtime_minutes")?
                        .unwrap_or(0.0),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CapabilityError::invalid_response(DOWNTIME, e.to_string()))
    }
}
