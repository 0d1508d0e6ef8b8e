//! Error types for the ProdOps domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all ProdOps operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure of an external request/response capability
/// (language model, lookups, ticket writer, knowledge search).
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("{capability} is not configured: {reason}")]
    NotConfigured { capability: String, reason: String },

    #[error("{capability} unavailable: {reason}")]
    Unavailable { capability: String, reason: String },

    #[error("{capability} request failed: {reason}")]
    Failed { capability: String, reason: String },

    #[error("{capability} timed out after {timeout_secs}s")]
    Timeout {
        capability: String,
        timeout_secs: u64,
    },

    #[error("{capability} returned an invalid response: {reason}")]
    InvalidResponse { capability: String, reason: String },
}

impl CapabilityError {
    pub fn unavailable(capability: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(capability: &str, reason: impl Into<String>) -> Self {
        Self::Failed {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(capability: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Name of the capability that failed.
    pub fn capability(&self) -> &str {
        match self {
            Self::NotConfigured { capability, .. }
            | Self::Unavailable { capability, .. }
            | Self::Failed { capability, .. }
            | Self::Timeout { capability, .. }
            | Self::InvalidResponse { capability, .. } => capability,
        }
    }
}

/// Persistence failures (user memory, audit log, migrations).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Notification delivery failures. Never propagated to the ticket-creation caller.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Delivery failed on {channel} to {recipient}: {reason}")]
    DeliveryFailed {
        channel: String,
        recipient: String,
        reason: String,
    },

    #[error("Delivery on {channel} to {recipient} timed out")]
    Timeout { channel: String, recipient: String },
}

/// Client input that is rejected before reaching any capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Message is {len} characters, maximum is {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("Invalid ticket number '{0}', expected TKT-XXXXXX")]
    InvalidTicketNumber(String),

    #[error("Limit {limit} out of range {min}-{max}")]
    LimitOutOfRange { limit: i64, min: i64, max: i64 },

    #[error("Invalid ticket status '{0}', expected OPEN, IN_PROGRESS or CLOSED")]
    InvalidStatus(String),

    #[error("Invalid severity '{0}', expected Low, Medium, High or Critical")]
    InvalidSeverity(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Authentication and role failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("User not found: {0}")]
    UnknownUser(String),

    #[error("Access denied. Required role(s): {}", .required.join(", "))]
    Forbidden { required: Vec<String> },
}
