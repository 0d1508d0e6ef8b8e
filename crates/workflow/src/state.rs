//! Per-turn state, threaded by value through the stages.

use prodops_core::{DowntimeEntry, ProductionSummary, TicketRecord, UserMemory, ValidationError};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::intent::Intent;

/// Maximum message length, in characters, after trimming.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// What a domain handler produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ToolResult {
    Production(ProductionSummary),
    Downtime(Vec<DowntimeEntry>),
    Ticket(TicketRecord),
}

/// Everything one turn knows. Lives for a single request.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub user_id: i64,
    pub roles: BTreeSet<String>,
    pub input: String,
    pub memory: UserMemory,
    intent: Option<Intent>,
    pub tool_result: Option<ToolResult>,
    pub retrieved_docs: Option<Vec<String>>,
    response: Option<String>,
}

/// Trim and bound a chat message.
pub fn validate_message(message: &str) -> Result<String, ValidationError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    let len = trimmed.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

impl TurnState {
    pub fn new<I, S>(user_id: i64, roles: I, message: &str) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            user_id,
            roles: roles.into_iter().map(Into::into).collect(),
            input: validate_message(message)?,
            memory: UserMemory::new(),
            intent: None,
            tool_result: None,
            retrieved_docs: None,
            response: None,
        })
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn intent(&self) -> Option<&Intent> {
        self.intent.as_ref()
    }

    /// Set the intent. Only the first call has any effect.
    pub fn set_intent(&mut self, intent: Intent) {
        if self.intent.is_none() {
            self.intent = Some(intent);
        }
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    /// Set the reply. The first writer wins; later calls are ignored.
    pub fn respond(&mut self, text: impl Into<String>) {
        if self.response.is_none() {
            self.response = Some(text.into());
        }
    }

    /// Consume the state, yielding the reply.
    pub fn into_response(self) -> Option<String> {
        self.response
    }
}
