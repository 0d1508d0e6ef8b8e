//! Notification outcomes and the audit log they are written to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StorageError;

/// Aggregate delivery status of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Sent,
    Partial,
    Failed,
}

impl DeliveryStatus {
    /// `Sent` iff nothing failed, `Failed` iff everything failed, else
    /// `Partial`. With zero recipients nothing failed, so the result is `Sent`.
    pub fn aggregate(attempted: usize, failed: usize) -> Self {
        if failed == 0 {
            DeliveryStatus::Sent
        } else if failed >= attempted {
            DeliveryStatus::Failed
        } else {
            DeliveryStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Partial => "PARTIAL",
            DeliveryStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record per dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationOutcome {
    pub ticket_id: i64,
    /// Channels attempted, e.g. "EMAIL+WHATSAPP".
    pub channel: String,
    /// Per-channel delivered counts, e.g. "EMAIL 1/1, WHATSAPP 0/1".
    pub recipient_summary: String,
    pub status: DeliveryStatus,
}

/// Append-only sink for notification outcomes.
#[async_trait]
pub trait NotificationAuditLog: Send + Sync {
    async fn record(&self, outcome: &NotificationOutcome) -> Result<(), StorageError>;
}
