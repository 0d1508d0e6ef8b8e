//! # ProdOps Core
//!
//! Domain types, capability traits, and error definitions for the ProdOps
//! manufacturing assistant. Every external collaborator (language model,
//! lookups, ticket store, memory, notification channels) is a trait here;
//! implementations live in the other workspace crates.

pub mod capability;
pub mod channel;
pub mod error;
pub mod event;
pub mod identity;
pub mod memory;
pub mod notification;
pub mod ticket;

// Re-export key types at crate root for ergonomics
pub use capability::{
    DowntimeEntry, DowntimeLookup, KnowledgeSearch, LanguageModel, ProductionLookup,
    ProductionSummary, TicketWriter,
};
pub use channel::{ChannelKind, NotificationChannel, OutboundMessage};
pub use error::{
    AuthError, CapabilityError, ChannelError, Error, Result, StorageError, ValidationError,
};
pub use event::{DomainEvent, EventBus};
pub use identity::{UserDirectory, UserIdentity};
pub use memory::{MemoryStore, UserMemory};
pub use notification::{DeliveryStatus, NotificationAuditLog, NotificationOutcome};
pub use ticket::{
    NewTicket, Severity, StatusChange, TicketDetails, TicketLimit, TicketNo, TicketRecord,
    TicketRepository, TicketStatus,
};
