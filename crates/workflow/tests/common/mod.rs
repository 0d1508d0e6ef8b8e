//! Shared test doubles for workflow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use prodops_config::{SafetyConfig, WorkflowConfig};
use prodops_core::error::{CapabilityError, StorageError};
use prodops_core::{
    DowntimeEntry, DowntimeLookup, KnowledgeSearch, LanguageModel, MemoryStore, NewTicket,
    ProductionLookup, ProductionSummary, TicketNo, TicketRecord, TicketStatus, TicketWriter,
    UserMemory,
};
use prodops_memory::InMemoryStore;
use prodops_security::SafetyFilter;
use prodops_workflow::{Capabilities, WorkflowEngine};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Prompt markers, one per prompt kind.
pub const SAFETY: &str = "SAFE or UNSAFE";
pub const CLASSIFY: &str = "Classify the user intent";
pub const LINE_DATE: &str = "LINE|YYYY-MM-DD";
pub const TICKET: &str = "Extract maintenance ticket fields";
pub const SUMMARIZE_PRODUCTION: &str = "Summarize the production data";
pub const SUMMARIZE_DOWNTIME: &str = "Summarize the downtime data";
pub const ANSWER_FROM_DOCS: &str = "Answer the question using only the documentation";

/// A model that answers by prompt kind and records every prompt it sees.
///
/// The safety check answers `SAFE` unless scripted otherwise. A prompt with
/// no scripted answer gets an empty reply.
pub struct ScriptedModel {
    rules: Vec<(&'static str, Result<String, CapabilityError>)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, marker: &'static str, answer: &str) -> Self {
        self.rules.push((marker, Ok(answer.to_string())));
        self
    }

    pub fn fail_on(mut self, marker: &'static str) -> Self {
        self.rules.push((
            marker,
            Err(CapabilityError::unavailable("language_model", "scripted failure")),
        ));
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompts_with(&self, marker: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains(marker))
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some((_, answer)) = self.rules.iter().find(|(m, _)| prompt.contains(m)) {
            return answer.clone();
        }
        if prompt.contains(SAFETY) {
            return Ok("SAFE".into());
        }
        Ok(String::new())
    }
}

pub struct RecordingProduction {
    pub result: Option<ProductionSummary>,
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<(String, NaiveDate)>>,
}

impl RecordingProduction {
    pub fn returning(result: Option<ProductionSummary>) -> Self {
        Self {
            result,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProductionLookup for RecordingProduction {
    async fn production_summary(
        &self,
        line_code: &str,
        date: NaiveDate,
    ) -> Result<Option<ProductionSummary>, CapabilityError> {
        self.calls.lock().unwrap().push((line_code.to_string(), date));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.result.clone())
    }
}

pub struct RecordingDowntime {
    pub result: Result<Vec<DowntimeEntry>, CapabilityError>,
    pub calls: Mutex<Vec<(String, NaiveDate)>>,
}

impl RecordingDowntime {
    pub fn returning(entries: Vec<DowntimeEntry>) -> Self {
        Self {
            result: Ok(entries),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(CapabilityError::unavailable("downtime_lookup", "db down")),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DowntimeLookup for RecordingDowntime {
    async fn downtime_summary(
        &self,
        line_code: &str,
        date: NaiveDate,
    ) -> Result<Vec<DowntimeEntry>, CapabilityError> {
        self.calls.lock().unwrap().push((line_code.to_string(), date));
        self.result.clone()
    }
}

#[derive(Default)]
pub struct RecordingTicketWriter {
    pub calls: Mutex<Vec<NewTicket>>,
}

impl RecordingTicketWriter {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<NewTicket> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TicketWriter for RecordingTicketWriter {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<TicketRecord, CapabilityError> {
        let severity = ticket.severity;
        let mut calls = self.calls.lock().unwrap();
        calls.push(ticket);
        Ok(TicketRecord {
            id: calls.len() as i64,
            ticket_no: TicketNo::parse("TKT-A1B2C3").unwrap(),
            severity,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        })
    }
}

pub struct StaticKnowledge {
    pub docs: Vec<String>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl StaticKnowledge {
    pub fn new(docs: &[&str]) -> Self {
        Self {
            docs: docs.iter().map(|d| d.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl KnowledgeSearch for StaticKnowledge {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, CapabilityError> {
        self.calls.lock().unwrap().push((query.to_string(), k));
        Ok(self.docs.iter().take(k).cloned().collect())
    }
}

/// Loads fine, refuses every save.
#[derive(Default)]
pub struct ReadOnlyMemory;

#[async_trait]
impl MemoryStore for ReadOnlyMemory {
    fn name(&self) -> &str {
        "read_only"
    }

    async fn load(&self, _user_id: i64) -> Result<UserMemory, StorageError> {
        Ok(UserMemory::new())
    }

    async fn save(&self, _user_id: i64, _memory: &UserMemory) -> Result<(), StorageError> {
        Err(StorageError::Storage("read only".into()))
    }
}

/// All test doubles for one engine.
pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub production: Arc<RecordingProduction>,
    pub downtime: Arc<RecordingDowntime>,
    pub tickets: Arc<RecordingTicketWriter>,
    pub knowledge: Arc<StaticKnowledge>,
    pub memory: Arc<InMemoryStore>,
    pub config: WorkflowConfig,
}

impl Harness {
    pub fn new(model: ScriptedModel) -> Self {
        Self {
            model: Arc::new(model),
            production: Arc::new(RecordingProduction::returning(None)),
            downtime: Arc::new(RecordingDowntime::returning(vec![])),
            tickets: Arc::new(RecordingTicketWriter::default()),
            knowledge: Arc::new(StaticKnowledge::new(&[])),
            memory: Arc::new(InMemoryStore::new()),
            config: WorkflowConfig::default(),
        }
    }

    pub fn with_production(mut self, production: RecordingProduction) -> Self {
        self.production = Arc::new(production);
        self
    }

    pub fn with_downtime(mut self, downtime: RecordingDowntime) -> Self {
        self.downtime = Arc::new(downtime);
        self
    }

    pub fn with_knowledge(mut self, knowledge: StaticKnowledge) -> Self {
        self.knowledge = Arc::new(knowledge);
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            model: self.model.clone(),
            production: self.production.clone(),
            downtime: self.downtime.clone(),
            tickets: self.tickets.clone(),
            knowledge: self.knowledge.clone(),
        }
    }

    pub fn engine(&self) -> WorkflowEngine {
        self.engine_with_memory(self.memory.clone())
    }

    pub fn engine_with_memory(&self, memory: Arc<dyn MemoryStore>) -> WorkflowEngine {
        let safety = SafetyFilter::new(self.model.clone(), &SafetyConfig::default());
        WorkflowEngine::new(self.capabilities(), memory, safety, self.config.clone())
    }

    /// Lookup, writer and search calls combined.
    pub fn data_calls(&self) -> usize {
        self.production.call_count()
            + self.downtime.call_count()
            + self.tickets.call_count()
            + self.knowledge.call_count()
    }
}

pub fn roles(roles: &[&str]) -> Vec<String> {
    roles.iter().map(|r| r.to_string()).collect()
}

pub fn line1_summary() -> ProductionSummary {
    ProductionSummary {
        line_code: "LINE-1".into(),
        production_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
        total_good: 400,
        total_reject: 12,
    }
}
