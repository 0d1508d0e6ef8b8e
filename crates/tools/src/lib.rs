//! Capability adapters for ProdOps.
//!
//! These give the workflow engine access to plant data: production and
//! downtime lookups, the ticket store, the user directory (all PostgreSQL),
//! and a keyword knowledge base over markdown documents.
//!
//! Without a database, [`Unconfigured`] stands in for every relational
//! capability and reports it as not configured.

pub mod knowledge;
pub mod unconfigured;

#[cfg(feature = "postgres")]
pub mod lookups;
#[cfg(feature = "postgres")]
pub mod tickets;
#[cfg(feature = "postgres")]
pub mod users;

pub use knowledge::KeywordKnowledgeBase;
pub use unconfigured::Unconfigured;

#[cfg(feature = "postgres")]
pub use lookups::{PgDowntimeLookup, PgProductionLookup};
#[cfg(feature = "postgres")]
pub use tickets::PgTicketStore;
#[cfg(feature = "postgres")]
pub use users::PgUserDirectory;

#[cfg(feature = "postgres")]
pub(crate) fn query_failed(capability: &str, e: sqlx::Error) -> prodops_core::CapabilityError {
    tracing::warn!(capability, error = %e, "Query failed");
    prodops_core::CapabilityError::failed(capability, e.to_string())
}
