//! Maintenance tickets: identifiers, enumerations, records, and the
//! repository trait behind the ticket endpoints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CapabilityError, ValidationError};

const TICKET_PREFIX: &str = "TKT-";
const TICKET_SUFFIX_LEN: usize = 6;

/// A ticket number of the form `TKT-XXXXXX` (six ASCII alphanumerics).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketNo(String);

impl TicketNo {
    /// Validate a ticket number supplied by a client.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let valid = raw
            .strip_prefix(TICKET_PREFIX)
            .is_some_and(|suffix| {
                suffix.len() == TICKET_SUFFIX_LEN
                    && suffix.chars().all(|c| c.is_ascii_alphanumeric())
            });
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidTicketNumber(raw.to_string()))
        }
    }

    /// Generate a fresh ticket number from a random UUID.
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{TICKET_PREFIX}{}",
            hex[..TICKET_SUFFIX_LEN].to_ascii_uppercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TicketNo {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TicketNo> for String {
    fn from(value: TicketNo) -> Self {
        value.0
    }
}

/// Ticket severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(ValidationError::InvalidSeverity(s.to_string())),
        }
    }
}

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(TicketStatus::Open),
            "IN_PROGRESS" => Ok(TicketStatus::InProgress),
            "CLOSED" => Ok(TicketStatus::Closed),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

/// Page size for ticket listings, 1 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketLimit(u16);

impl TicketLimit {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 100;

    pub fn new(limit: i64) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&limit) {
            Ok(Self(limit as u16))
        } else {
            Err(ValidationError::LimitOutOfRange {
                limit,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(&self) -> i64 {
        i64::from(self.0)
    }
}

impl Default for TicketLimit {
    fn default() -> Self {
        Self(50)
    }
}

/// Input to the ticket writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub line_code: String,
    pub issue_summary: String,
    pub severity: Severity,
    pub created_by_user_id: i64,
}

/// A created ticket as returned by the writer. This is also the event handed
/// to the notification dispatcher; it is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: i64,
    pub ticket_no: TicketNo,
    pub severity: Severity,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

/// A ticket as shown to users, with its author's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDetails {
    pub ticket_no: TicketNo,
    pub issue_summary: String,
    pub severity: Severity,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// A committed status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub ticket_no: TicketNo,
    pub old_status: TicketStatus,
    pub new_status: TicketStatus,
}

/// Read and status-update access to tickets.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn get_ticket(
        &self,
        ticket_no: &TicketNo,
    ) -> Result<Option<TicketDetails>, CapabilityError>;

    /// Most recent first.
    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
        limit: TicketLimit,
    ) -> Result<Vec<TicketDetails>, CapabilityError>;

    /// Returns `None` when the ticket does not exist. Implementations publish
    /// a status-changed event after the update commits.
    async fn update_status(
        &self,
        ticket_no: &TicketNo,
        status: TicketStatus,
    ) -> Result<Option<StatusChange>, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_no_accepts_valid_format() {
        let no = TicketNo::parse("TKT-A1B2C3").unwrap();
        assert_eq!(no.as_str(), "TKT-A1B2C3");
    }

    #[test]
    fn ticket_no_rejects_bad_formats() {
        for bad in ["TKT-123", "TKT-1234567", "ABC-123456", "TKT-12 456", "", "TKT-12345!"] {
            assert!(TicketNo::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn generated_ticket_no_is_valid() {
        let no = TicketNo::generate();
        assert!(TicketNo::parse(no.as_str()).is_ok());
        assert_eq!(no.as_str(), no.as_str().to_ascii_uppercase());
    }

    #[test]
    fn ticket_no_deserialization_validates() {
        let ok: Result<TicketNo, _> = serde_json::from_str("\"TKT-ABCDEF\"");
        assert!(ok.is_ok());
        let bad: Result<TicketNo, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }

    #[test]
    fn severity_parsing_is_case_insensitive() {
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" Critical ".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("urgent".parse::<Severity>().is_err());
        assert_eq!(Severity::default(), Severity::Medium);
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        assert_eq!("in_progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!(serde_json::to_string(&TicketStatus::InProgress).unwrap(), "\"IN_PROGRESS\"");
        assert!(matches!(
            "DONE".parse::<TicketStatus>(),
            Err(ValidationError::InvalidStatus(_))
        ));
    }

    #[test]
    fn limit_bounds() {
        assert!(TicketLimit::new(0).is_err());
        assert!(TicketLimit::new(101).is_err());
        assert_eq!(TicketLimit::new(100).unwrap().get(), 100);
        assert_eq!(TicketLimit::default().get(), 50);
    }
}
