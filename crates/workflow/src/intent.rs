//! Classified intent of a user message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of intents the engine routes on.
///
/// Any label the classifier produces that is not one of the three domain
/// labels is kept verbatim in [`Intent::Other`] and routed to knowledge
/// lookup. [`Intent::Blocked`] is only ever set by the safety filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    ProductionQuery,
    DowntimeQuery,
    CreateTicket,
    Other(String),
    Blocked,
}

impl Intent {
    /// Map a classifier label. Surrounding whitespace is ignored; anything
    /// else must match exactly.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "PRODUCTION_QUERY" => Intent::ProductionQuery,
            "DOWNTIME_QUERY" => Intent::DowntimeQuery,
            "CREATE_TICKET" => Intent::CreateTicket,
            other => Intent::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Intent::ProductionQuery => "PRODUCTION_QUERY",
            Intent::DowntimeQuery => "DOWNTIME_QUERY",
            Intent::CreateTicket => "CREATE_TICKET",
            Intent::Other(label) => label,
            Intent::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
