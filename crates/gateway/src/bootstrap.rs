//! Service construction from configuration.
//!
//! Everything is built once here and shared by `Arc` with the HTTP
//! handlers, the notification worker and the local `chat` command.

use prodops_channels::{
    InMemoryAuditLog, NotificationDispatcher, PgAuditLog, deliver_pending, spawn_notification_worker,
};
use prodops_config::AppConfig;
use prodops_core::{
    DomainEvent, DowntimeLookup, EventBus, LanguageModel, MemoryStore, NotificationAuditLog, ProductionLookup,
    Result, TicketRepository, TicketWriter, UserDirectory,
};
use prodops_memory::{InMemoryStore, PostgresStore};
use prodops_providers::OpenAiCompatModel;
use prodops_security::{SafetyFilter, TokenSigner};
use prodops_tools::{
    KeywordKnowledgeBase, PgDowntimeLookup, PgProductionLookup, PgTicketStore, PgUserDirectory,
    Unconfigured,
};
use prodops_workflow::{Capabilities, WorkflowEngine};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{AppState, RateLimiter};

/// Relational capabilities, backed by PostgreSQL or unconfigured.
struct Relational {
    production: Arc<dyn ProductionLookup>,
    downtime: Arc<dyn DowntimeLookup>,
    ticket_writer: Arc<dyn TicketWriter>,
    tickets: Arc<dyn TicketRepository>,
    users: Arc<dyn UserDirectory>,
    memory: Arc<dyn MemoryStore>,
    audit: Arc<dyn NotificationAuditLog>,
}

/// All long-lived services of one process.
pub struct Services {
    pub config: AppConfig,
    pub engine: Arc<WorkflowEngine>,
    pub production: Arc<dyn ProductionLookup>,
    pub downtime: Arc<dyn DowntimeLookup>,
    pub ticket_writer: Arc<dyn TicketWriter>,
    pub tickets: Arc<dyn TicketRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub events: Arc<EventBus>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub database_configured: bool,
}

impl Services {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiCompatModel::from_config(&config.llm)?);
        let events = Arc::new(EventBus::default());

        let database_configured = config.database.url.is_some();
        let relational = match &config.database.url {
            Some(url) => connect_postgres(url, &config, events.clone()).await?,
            None => {
                warn!("database.url is not set; lookups and tickets are unavailable, memory is not persisted");
                offline()
            }
        };

        let knowledge = KeywordKnowledgeBase::load_dir(
            Path::new(&config.knowledge.docs_dir),
            config.knowledge.chunk_chars,
        )
        .await?;
        info!(chunks = knowledge.len(), dir = %config.knowledge.docs_dir, "Knowledge base loaded");

        let safety = SafetyFilter::new(model.clone(), &config.safety)
            .with_timeout(Duration::from_secs(config.workflow.capability_timeout_secs));

        let engine = WorkflowEngine::new(
            Capabilities {
                model,
                production: relational.production.clone(),
                downtime: relational.downtime.clone(),
                tickets: relational.ticket_writer.clone(),
                knowledge: Arc::new(knowledge),
            },
            relational.memory.clone(),
            safety,
            config.workflow.clone(),
        );

        let dispatcher = NotificationDispatcher::from_config(&config.notifications, relational.audit)?;

        Ok(Self {
            engine: Arc::new(engine),
            production: relational.production,
            downtime: relational.downtime,
            ticket_writer: relational.ticket_writer,
            tickets: relational.tickets,
            users: relational.users,
            events,
            dispatcher: Arc::new(dispatcher),
            database_configured,
            config,
        })
    }

    /// Start consuming ticket events.
    pub fn spawn_notification_worker(&self) -> JoinHandle<()> {
        spawn_notification_worker(self.dispatcher.clone(), &self.events)
    }

    /// Subscribe to ticket events published from now on.
    pub fn subscribe_events(&self) -> Receiver<Arc<DomainEvent>> {
        self.events.subscribe()
    }

    /// Deliver the events queued on `events` and wait for every send and
    /// audit write to finish.
    pub async fn deliver_pending_notifications(
        &self,
        events: &mut Receiver<Arc<DomainEvent>>,
    ) -> usize {
        deliver_pending(&self.dispatcher, events).await
    }

    /// Handler state for the HTTP router.
    pub fn app_state(&self) -> AppState {
        let gateway = &self.config.gateway;
        let secret = gateway.token_secret.clone().unwrap_or_else(|| {
            warn!("gateway.token_secret is not set; using an ephemeral secret, tokens will not survive a restart");
            uuid::Uuid::new_v4().to_string()
        });

        AppState {
            engine: self.engine.clone(),
            production: self.production.clone(),
            downtime: self.downtime.clone(),
            ticket_writer: self.ticket_writer.clone(),
            tickets: self.tickets.clone(),
            users: self.users.clone(),
            signer: Arc::new(TokenSigner::new(
                secret,
                chrono::Duration::minutes(gateway.token_ttl_minutes),
            )),
            chat_limiter: Arc::new(RateLimiter::per_minute(gateway.chat_rate_per_minute)),
            ticket_limiter: Arc::new(RateLimiter::per_minute(gateway.ticket_rate_per_minute)),
            database_configured: self.database_configured,
        }
    }
}

async fn connect_postgres(url: &str, config: &AppConfig, events: Arc<EventBus>) -> Result<Relational> {
    let store = PostgresStore::connect(url, config.database.max_connections).await?;
    let pool = store.pool().clone();
    let audit = PgAuditLog::new(pool.clone());

    if config.database.run_migrations {
        store.migrate().await?;
        audit.migrate().await?;
    }

    let tickets = Arc::new(PgTicketStore::new(pool.clone(), events));
    Ok(Relational {
        production: Arc::new(PgProductionLookup::new(pool.clone())),
        downtime: Arc::new(PgDowntimeLookup::new(pool.clone())),
        ticket_writer: tickets.clone(),
        tickets,
        users: Arc::new(PgUserDirectory::new(pool)),
        memory: Arc::new(store),
        audit: Arc::new(audit),
    })
}

fn offline() -> Relational {
    let unconfigured = Arc::new(Unconfigured);
    Relational {
        production: unconfigured.clone(),
        downtime: unconfigured.clone(),
        ticket_writer: unconfigured.clone(),
        tickets: unconfigured.clone(),
        users: unconfigured,
        memory: Arc::new(InMemoryStore::new()),
        audit: Arc::new(InMemoryAuditLog::new()),
    }
}
