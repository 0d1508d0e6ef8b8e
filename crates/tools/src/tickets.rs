//! PostgreSQL ticket store.
//!
//! Implements both the workflow's [`TicketWriter`] and the read/update
//! [`TicketRepository`]. Domain events are published on the shared
//! [`EventBus`] only after the corresponding write has committed.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use prodops_core::error::CapabilityError;
use prodops_core::{
    DomainEvent, EventBus, NewTicket, Severity, StatusChange, TicketDetails, TicketLimit,
    TicketNo, TicketRecord, TicketRepository, TicketStatus, TicketWriter,
};

use crate::query_failed;

const WRITER: &str = "ticket_writer";
const REPOSITORY: &str = "ticket_repository";

pub struct PgTicketStore {
    pool: PgPool,
    events: Arc<EventBus>,
}

impl PgTicketStore {
    pub fn new(pool: PgPool, events: Arc<EventBus>) -> Self {
        Self { pool, events }
    }
}

fn decode_err(capability: &'static str) -> impl Fn(sqlx::Error) -> CapabilityError {
    move |e| CapabilityError::invalid_response(capability, e.to_string())
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = prodops_core::ValidationError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: prodops_core::ValidationError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn row_to_record(row: &PgRow) -> Result<TicketRecord, sqlx::Error> {
    Ok(TicketRecord {
        id: row.try_get("id")?,
        ticket_no: parse_ticket_no(row)?,
        severity: parse_column::<Severity>(row, "severity")?,
        status: parse_column::<TicketStatus>(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_details(row: &PgRow) -> Result<TicketDetails, sqlx::Error> {
    Ok(TicketDetails {
        ticket_no: parse_ticket_no(row)?,
        issue_summary: row.try_get("issue_summary")?,
        severity: parse_column::<Severity>(row, "severity")?,
        status: parse_column::<TicketStatus>(row, "status")?,
        created_at: row.try_get("created_at")?,
        created_by: row
            .try_get::<Option<String>, _>("created_by")?
            .unwrap_or_default(),
    })
}

fn parse_ticket_no(row: &PgRow) -> Result<TicketNo, sqlx::Error> {
    let raw: String = row.try_get("ticket_no")?;
    TicketNo::parse(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: "ticket_no".into(),
        source: Box::new(e),
    })
}

const DETAILS_SELECT: &str = "SELECT t.ticket_no, t.issue_summary, t.severity, t.status, \
        t.created_at::TIMESTAMPTZ AS created_at, u.full_name AS created_by \
     FROM tickets t \
     JOIN users u ON t.created_by = u.id";

#[async_trait]
impl TicketWriter for PgTicketStore {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<TicketRecord, CapabilityError> {
        let ticket_no = TicketNo::generate();

        // The line id is resolved in the same statement; an unknown line
        // inserts nothing and returns no row.
        let row = sqlx::query(
            "INSERT INTO tickets \
               (ticket_no, ticket_type, line_id, issue_summary, severity, status, created_by) \
             SELECT $1, 'Maintenance', id, $2, $3, 'OPEN', $4 \
             FROM production_lines WHERE line_code = $5 \
             RETURNING id::BIGINT AS id, ticket_no, severity, status, \
                       created_at::TIMESTAMPTZ AS created_at",
        )
        .bind(ticket_no.as_str())
        .bind(&ticket.issue_summary)
        .bind(ticket.severity.as_str())
        .bind(ticket.created_by_user_id)
        .bind(&ticket.line_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed(WRITER, e))?
        .ok_or_else(|| {
            CapabilityError::failed(WRITER, format!("unknown line '{}'", ticket.line_code))
        })?;

        let record = row_to_record(&row).map_err(decode_err(WRITER))?;

        info!(
            ticket_no = %record.ticket_no,
            severity = %record.severity,
            line_code = %ticket.line_code,
            "Ticket created"
        );
        self.events.publish(DomainEvent::TicketCreated(record.clone()));

        Ok(record)
    }
}

#[async_trait]
impl TicketRepository for PgTicketStore {
    async fn get_ticket(
        &self,
        ticket_no: &TicketNo,
    ) -> Result<Option<TicketDetails>, CapabilityError> {
        let sql = format!("{DETAILS_SELECT} WHERE t.ticket_no = $1");
        let row = sqlx::query(&sql)
            .bind(ticket_no.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed(REPOSITORY, e))?;

        row.as_ref()
            .map(row_to_details)
            .transpose()
            .map_err(decode_err(REPOSITORY))
    }

    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        limit: TicketLimit,
    ) -> Result<Vec<TicketDetails>, CapabilityError> {
        let sql = format!(
            "{DETAILS_SELECT} WHERE ($1::TEXT IS NULL OR t.status = $1) \
             ORDER BY t.created_at DESC LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(limit.get())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_failed(REPOSITORY, e))?;

        rows.iter()
            .map(row_to_details)
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_err(REPOSITORY))
    }

    async fn update_status(
        &self,
        ticket_no: &TicketNo,
        new_status: TicketStatus,
    ) -> Result<Option<StatusChange>, CapabilityError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_failed(REPOSITORY, e))?;

        let Some(row) = sqlx::query("SELECT status FROM tickets WHERE ticket_no = $1 FOR UPDATE")
            .bind(ticket_no.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| query_failed(REPOSITORY, e))?
        else {
            return Ok(None);
        };
        let old_status =
            parse_column::<TicketStatus>(&row, "status").map_err(decode_err(REPOSITORY))?;

        sqlx::query("UPDATE tickets SET status = $1 WHERE ticket_no = $2")
            .bind(new_status.as_str())
            .bind(ticket_no.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| query_failed(REPOSITORY, e))?;

        tx.commit().await.map_err(|e| query_failed(REPOSITORY, e))?;

        let change = StatusChange {
            ticket_no: ticket_no.clone(),
            old_status,
            new_status,
        };
        info!(
            ticket_no = %change.ticket_no,
            old_status = %change.old_status,
            new_status = %change.new_status,
            "Ticket status updated"
        );
        self.events
            .publish(DomainEvent::TicketStatusChanged(change.clone()));

        Ok(Some(change))
    }
}
