//! Parsing of extraction answers. Malformed answers never fail a turn;
//! they fall back to defaults.

use chrono::NaiveDate;
use prodops_core::Severity;
use serde::Deserialize;
use tracing::debug;

/// Parse `LINE|YYYY-MM-DD`. Anything else yields `(default_line, today)`.
pub fn parse_line_date(answer: &str, default_line: &str, today: NaiveDate) -> (String, NaiveDate) {
    let parsed = answer.trim().split_once('|').and_then(|(line, date)| {
        let line = line.trim();
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
        (!line.is_empty()).then(|| (line.to_string(), date))
    });

    parsed.unwrap_or_else(|| {
        debug!(answer, "Unparsable line|date extraction, using defaults");
        (default_line.to_string(), today)
    })
}

/// Fields for a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFields {
    pub line_code: String,
    pub issue: String,
    pub severity: Severity,
}

#[derive(Debug, Deserialize)]
struct RawTicketFields {
    #[serde(default)]
    line_code: Option<String>,
    #[serde(default)]
    issue: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

/// Parse the ticket extraction JSON, tolerating surrounding prose or code
/// fences. Unparsable output gives the default line, the raw input as the
/// issue, and `Medium`; a parsed object falls back field by field.
pub fn parse_ticket_fields(answer: &str, input: &str, default_line: &str) -> TicketFields {
    let defaults = TicketFields {
        line_code: default_line.to_string(),
        issue: input.to_string(),
        severity: Severity::default(),
    };

    let Some(raw) = json_object(answer).and_then(|s| serde_json::from_str::<RawTicketFields>(s).ok())
    else {
        debug!(answer, "Unparsable ticket extraction, using defaults");
        return defaults;
    };

    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    TicketFields {
        line_code: non_empty(raw.line_code).unwrap_or(defaults.line_code),
        issue: non_empty(raw.issue).unwrap_or(defaults.issue),
        severity: raw
            .severity
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.severity),
    }
}

fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
