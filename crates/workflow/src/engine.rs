//! The workflow engine: one user message in, one reply out.
//!
//! ```text
//! LOAD_MEMORY → CLASSIFY → {PRODUCTION | DOWNTIME | TICKET | KNOWLEDGE}
//!             → FORMAT → PERSIST_MEMORY → END
//! ```
//!
//! Blocked input jumps from CLASSIFY straight to PERSIST_MEMORY. Stages run
//! sequentially; each takes the [`TurnState`] by value and returns the next
//! one. The engine is built once and shared behind an `Arc`.

use prodops_config::WorkflowConfig;
use prodops_core::{
    CapabilityError, DowntimeLookup, KnowledgeSearch, LanguageModel, MemoryStore,
    ProductionLookup, TicketWriter, ValidationError,
};
use prodops_security::SafetyFilter;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info};

use crate::error::WorkflowError;
use crate::intent::Intent;
use crate::state::TurnState;

/// Reply for any turn that failed on a capability or the memory store.
pub const GENERIC_FAILURE_REPLY: &str =
    "Sorry, an error occurred while processing your request. Please try again later.";

/// The external services one turn may call.
#[derive(Clone)]
pub struct Capabilities {
    pub model: Arc<dyn LanguageModel>,
    pub production: Arc<dyn ProductionLookup>,
    pub downtime: Arc<dyn DowntimeLookup>,
    pub tickets: Arc<dyn TicketWriter>,
    pub knowledge: Arc<dyn KnowledgeSearch>,
}

/// Workflow stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadMemory,
    Classify,
    Production,
    Downtime,
    Ticket,
    Knowledge,
    Format,
    PersistMemory,
    End,
}

/// The stage an intent is handled by. Total over [`Intent`].
pub fn route(intent: &Intent) -> Stage {
    match intent {
        Intent::ProductionQuery => Stage::Production,
        Intent::DowntimeQuery => Stage::Downtime,
        Intent::CreateTicket => Stage::Ticket,
        Intent::Other(_) => Stage::Knowledge,
        Intent::Blocked => Stage::PersistMemory,
    }
}

impl Stage {
    fn next(self, state: &TurnState) -> Stage {
        match self {
            Stage::LoadMemory => Stage::Classify,
            // Classification always sets an intent
            Stage::Classify => state.intent().map(route).unwrap_or(Stage::Format),
            Stage::Production | Stage::Downtime | Stage::Ticket | Stage::Knowledge => {
                Stage::Format
            }
            Stage::Format => Stage::PersistMemory,
            Stage::PersistMemory | Stage::End => Stage::End,
        }
    }
}

type UserLock = Arc<tokio::sync::Mutex<()>>;

/// One async lock per user with a turn in flight. Entries are removed when
/// the last holder or waiter for a user is done.
#[derive(Default)]
pub(crate) struct UserLocks {
    locks: Mutex<HashMap<i64, UserLock>>,
}

impl UserLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<i64, UserLock>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) async fn acquire(&self, user_id: i64) -> UserTurn<'_> {
        let lock = self.map().entry(user_id).or_default().clone();
        let mut turn = UserTurn {
            locks: self,
            user_id,
            lock,
            guard: None,
        };
        turn.guard = Some(turn.lock.clone().lock_owned().await);
        turn
    }

    pub(crate) fn len(&self) -> usize {
        self.map().len()
    }
}

/// Held for the duration of one serialized turn.
pub(crate) struct UserTurn<'a> {
    locks: &'a UserLocks,
    user_id: i64,
    lock: UserLock,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserTurn<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.map();
        // Clones are only taken under the map lock, so two owners means the
        // map entry and this turn.
        let ours = map
            .get(&self.user_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock));
        if ours && Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.user_id);
        }
    }
}

pub struct WorkflowEngine {
    pub(crate) capabilities: Capabilities,
    pub(crate) memory: Arc<dyn MemoryStore>,
    pub(crate) safety: SafetyFilter,
    pub(crate) config: WorkflowConfig,
    user_locks: UserLocks,
}

impl WorkflowEngine {
    pub fn new(
        capabilities: Capabilities,
        memory: Arc<dyn MemoryStore>,
        safety: SafetyFilter,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            capabilities,
            memory,
            safety,
            config,
            user_locks: UserLocks::default(),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run one turn and return the reply.
    ///
    /// Only an invalid message is an error. Capability and memory failures
    /// are logged and answered with [`GENERIC_FAILURE_REPLY`].
    pub async fn submit_turn(
        &self,
        user_id: i64,
        roles: &[String],
        message: &str,
    ) -> Result<String, ValidationError> {
        let state = TurnState::new(user_id, roles.iter().cloned(), message)?;

        let _turn = if self.config.serialize_user_turns {
            Some(self.user_locks.acquire(user_id).await)
        } else {
            None
        };

        match self.execute(state).await {
            Ok(state) => Ok(state
                .into_response()
                .unwrap_or_else(|| GENERIC_FAILURE_REPLY.to_string())),
            Err(e) => {
                error!(user_id, error = %e, "Turn failed");
                Ok(GENERIC_FAILURE_REPLY.to_string())
            }
        }
    }

    /// Run one turn and return the final state. Errors are not converted
    /// into a reply.
    pub async fn run_turn(
        &self,
        user_id: i64,
        roles: &[String],
        message: &str,
    ) -> Result<TurnState, WorkflowError> {
        let state = TurnState::new(user_id, roles.iter().cloned(), message)?;
        self.execute(state).await
    }

    async fn execute(&self, mut state: TurnState) -> Result<TurnState, WorkflowError> {
        let mut stage = Stage::LoadMemory;
        while stage != Stage::End {
            debug!(user_id = state.user_id, ?stage, "Entering stage");
            state = match stage {
                Stage::LoadMemory => self.load_memory(state).await?,
                Stage::Classify => self.classify(state).await?,
                Stage::Production => self.handle_production(state).await?,
                Stage::Downtime => self.handle_downtime(state).await?,
                Stage::Ticket => self.handle_ticket(state).await?,
                Stage::Knowledge => self.retrieve_knowledge(state).await?,
                Stage::Format => self.format(state).await?,
                Stage::PersistMemory => self.persist_memory(state).await,
                Stage::End => state,
            };
            stage = stage.next(&state);
        }

        info!(
            user_id = state.user_id,
            intent = %state.intent().map(Intent::as_str).unwrap_or("-"),
            "Turn complete"
        );
        Ok(state)
    }

    /// Await a capability call under the configured timeout.
    pub(crate) async fn call<T, F>(&self, capability: &str, fut: F) -> Result<T, CapabilityError>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        let timeout_secs = self.config.capability_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout {
                capability: capability.to_string(),
                timeout_secs,
            }),
        }
    }
}
