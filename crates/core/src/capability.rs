//! Capability traits: the external request/response services the workflow
//! engine depends on but does not implement.
//!
//! Each capability is a pure boundary: no state is exposed to the caller and
//! no call depends on a previous one. Implementations: HTTP language model
//! (`prodops-providers`), PostgreSQL lookups and ticket writer plus a keyword
//! knowledge base (`prodops-tools`), and hand-written stubs in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::ticket::{NewTicket, TicketRecord};

/// Aggregated production for one line on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionSummary {
    pub line_code: String,
    pub production_date: NaiveDate,
    pub total_good: i64,
    pub total_reject: i64,
}

/// Downtime for one line on one day, grouped by reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeEntry {
    pub reason_code: String,
    pub reason_text: String,
    pub downtime_minutes: f64,
}

/// Text-in/text-out language model.
///
/// Used for safety checks, intent classification, parameter extraction and
/// reply synthesis. Never streaming, never stateful across calls.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Human-readable name (e.g. "openai", "scripted").
    fn name(&self) -> &str;

    /// Complete a single prompt.
    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError>;
}

#[async_trait]
pub trait ProductionLookup: Send + Sync {
    /// Total good and reject quantity for a line on a date. `None` when the
    /// line produced nothing that day.
    async fn production_summary(
        &self,
        line_code: &str,
        date: NaiveDate,
    ) -> Result<Option<ProductionSummary>, CapabilityError>;
}

#[async_trait]
pub trait DowntimeLookup: Send + Sync {
    /// Downtime grouped by reason, longest first. Possibly empty.
    async fn downtime_summary(
        &self,
        line_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<DowntimeEntry>, CapabilityError>;
}

/// Creates maintenance tickets.
///
/// Implementations publish a ticket-created event after their own write
/// commits; the caller never waits on notification delivery.
#[async_trait]
pub trait TicketWriter: Send + Sync {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<TicketRecord, CapabilityError>;
}

#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    /// Up to `k` snippets, most relevant first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, CapabilityError>;
}
