//! Stage implementations.

use chrono::{NaiveDate, Utc};
use prodops_core::{DowntimeEntry, NewTicket, ProductionSummary, TicketRecord};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::WorkflowEngine;
use crate::error::WorkflowError;
use crate::extract::{parse_line_date, parse_ticket_fields};
use crate::intent::Intent;
use crate::prompts;
use crate::state::{ToolResult, TurnState};

pub const BLOCKED_REPLY: &str =
    "I can't help with that request. It was blocked by the safety filter.";

pub const NOT_AUTHORIZED_REPLY: &str = "You are not authorized to create tickets.";

pub const FOUND_REPLY: &str = "I found the information you asked for.";

pub const CAPABILITIES_REPLY: &str = "I can report daily production and downtime for a line, \
    answer questions from the plant documentation, and let supervisors create maintenance \
    tickets. Could you rephrase your request?";

const MODEL: &str = "language_model";

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub(crate) fn production_template(summary: &ProductionSummary) -> String {
    format!(
        "{} produced {} good units and {} reject units on {}.",
        summary.line_code, summary.total_good, summary.total_reject, summary.production_date
    )
}

pub(crate) fn downtime_template(line: &str, date: NaiveDate, entries: &[DowntimeEntry]) -> String {
    let total: f64 = entries.iter().map(|e| e.downtime_minutes).sum();
    let reasons = entries
        .iter()
        .map(|e| format!("{} ({:.0} min)", e.reason_text, e.downtime_minutes))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{line} had {total:.0} minutes of downtime on {date}: {reasons}.")
}

pub(crate) fn ticket_confirmation(ticket: &TicketRecord) -> String {
    format!(
        "Ticket {} has been created with {} severity. Status: {}.",
        ticket.ticket_no, ticket.severity, ticket.status
    )
}

impl WorkflowEngine {
    pub async fn load_memory(&self, mut state: TurnState) -> Result<TurnState, WorkflowError> {
        state.memory = self.memory.load(state.user_id).await?;
        debug!(user_id = state.user_id, keys = state.memory.len(), "Memory loaded");
        Ok(state)
    }

    pub async fn classify(&self, mut state: TurnState) -> Result<TurnState, WorkflowError> {
        if !self.safety.check(&state.input).await.is_safe() {
            warn!(user_id = state.user_id, "Input blocked by safety filter");
            state.set_intent(Intent::Blocked);
            state.respond(BLOCKED_REPLY);
            return Ok(state);
        }

        let memory = serde_json::to_string(&state.memory).unwrap_or_else(|_| "{}".into());
        let prompt = prompts::render(
            prompts::CLASSIFY,
            &[("memory", memory.as_str()), ("input", state.input.as_str())],
        );
        let label = self
            .call(MODEL, self.capabilities.model.complete(&prompt))
            .await?;

        let intent = Intent::from_label(&label);
        debug!(user_id = state.user_id, %intent, "Intent classified");
        state.set_intent(intent);
        Ok(state)
    }

    async fn extract_line_date(&self, state: &TurnState) -> Result<(String, NaiveDate), WorkflowError> {
        let today = Utc::now().date_naive();
        let today_str = today.to_string();
        let prompt = prompts::render(
            prompts::EXTRACT_LINE_DATE,
            &[
                ("today", today_str.as_str()),
                ("default_line", self.config.default_line.as_str()),
                ("input", state.input.as_str()),
            ],
        );
        let answer = self
            .call(MODEL, self.capabilities.model.complete(&prompt))
            .await?;
        Ok(parse_line_date(&answer, &self.config.default_line, today))
    }

    async fn synthesize(&self, template: &str, vars: &[(&str, &str)]) -> Result<String, WorkflowError> {
        let prompt = prompts::render(template, vars);
        let reply = self
            .call(MODEL, self.capabilities.model.complete(&prompt))
            .await?;
        Ok(reply.trim().to_string())
    }

    pub async fn handle_production(
        &self,
        mut state: TurnState,
    ) -> Result<TurnState, WorkflowError> {
        let (line, date) = self.extract_line_date(&state).await?;
        let summary = self
            .call(
                "production_lookup",
                self.capabilities.production.production_summary(&line, date),
            )
            .await?;

        let Some(summary) = summary else {
            state.respond(format!("No production data found for {line} on {date}."));
            return Ok(state);
        };

        let data = serde_json::to_string(&summary).unwrap_or_default();
        let reply = self
            .synthesize(
                prompts::SUMMARIZE_PRODUCTION,
                &[("input", state.input.as_str()), ("data", data.as_str())],
            )
            .await?;

        state.respond(if reply.is_empty() {
            production_template(&summary)
        } else {
            reply
        });
        state.tool_result = Some(ToolResult::Production(summary));
        Ok(state)
    }

    pub async fn handle_downtime(
        &self,
        mut state: TurnState,
    ) -> Result<TurnState, WorkflowError> {
        let (line, date) = self.extract_line_date(&state).await?;
        let entries = self
            .call(
                "downtime_lookup",
                self.capabilities.downtime.downtime_summary(&line, date),
            )
            .await?;

        if entries.is_empty() {
            state.respond(format!("No downtime recorded for {line} on {date}."));
            return Ok(state);
        }

        let data = serde_json::to_string(&entries).unwrap_or_default();
        let reply = self
            .synthesize(
                prompts::SUMMARIZE_DOWNTIME,
                &[("input", state.input.as_str()), ("data", data.as_str())],
            )
            .await?;

        state.respond(if reply.is_empty() {
            downtime_template(&line, date, &entries)
        } else {
            reply
        });
        state.tool_result = Some(ToolResult::Downtime(entries));
        Ok(state)
    }

    pub async fn handle_ticket(&self, mut state: TurnState) -> Result<TurnState, WorkflowError> {
        if !state.has_role(&self.config.supervisor_role) {
            info!(user_id = state.user_id, "Ticket creation refused, missing role");
            state.respond(NOT_AUTHORIZED_REPLY);
            return Ok(state);
        }

        let prompt = prompts::render(
            prompts::EXTRACT_TICKET,
            &[
                ("default_line", self.config.default_line.as_str()),
                ("input", state.input.as_str()),
            ],
        );
        let answer = self
            .call(MODEL, self.capabilities.model.complete(&prompt))
            .await?;
        let fields = parse_ticket_fields(&answer, &state.input, &self.config.default_line);

        let ticket = self
            .call(
                "ticket_writer",
                self.capabilities.tickets.create_ticket(NewTicket {
                    line_code: fields.line_code,
                    issue_summary: fields.issue,
                    severity: fields.severity,
                    created_by_user_id: state.user_id,
                }),
            )
            .await?;

        state.respond(ticket_confirmation(&ticket));
        state.tool_result = Some(ToolResult::Ticket(ticket));
        Ok(state)
    }

    pub async fn retrieve_knowledge(
        &self,
        mut state: TurnState,
    ) -> Result<TurnState, WorkflowError> {
        let docs = self
            .call(
                "knowledge_search",
                self.capabilities
                    .knowledge
                    .search(&state.input, self.config.knowledge_top_k),
            )
            .await?;
        debug!(user_id = state.user_id, hits = docs.len(), "Knowledge retrieved");
        state.retrieved_docs = Some(docs);
        Ok(state)
    }

    /// Idempotent: a turn that already has a reply is returned unchanged.
    pub async fn format(&self, mut state: TurnState) -> Result<TurnState, WorkflowError> {
        if state.response().is_some() {
            return Ok(state);
        }

        let docs = state.retrieved_docs.as_deref().unwrap_or_default();
        if !docs.is_empty() {
            let top = &docs[..docs.len().min(self.config.knowledge_top_k)];
            let excerpts = top.join("\n---\n");
            let reply = self
                .synthesize(
                    prompts::ANSWER_FROM_DOCS,
                    &[("input", state.input.as_str()), ("docs", excerpts.as_str())],
                )
                .await?;
            let reply = if reply.is_empty() { top[0].clone() } else { reply };
            state.respond(reply);
        } else if state.tool_result.is_some() {
            state.respond(FOUND_REPLY);
        } else {
            state.respond(CAPABILITIES_REPLY);
        }
        Ok(state)
    }

    /// Merge this turn's facts into memory and save. A failed save is logged
    /// and the reply is still returned.
    pub async fn persist_memory(&self, mut state: TurnState) -> TurnState {
        let intent = state.intent().map(|i| i.as_str().to_string()).unwrap_or_default();
        let response = truncate_chars(
            state.response().unwrap_or_default(),
            self.config.memory_response_chars,
        );

        state.memory.insert("last_intent".into(), Value::String(intent));
        state
            .memory
            .insert("last_query".into(), Value::String(state.input.clone()));
        state
            .memory
            .insert("last_response".into(), Value::String(response));
        state
            .memory
            .insert("timestamp".into(), Value::String(Utc::now().to_rfc3339()));

        if let Err(e) = self.memory.save(state.user_id, &state.memory).await {
            warn!(user_id = state.user_id, error = %e, "Failed to persist memory");
        }
        state
    }
}
