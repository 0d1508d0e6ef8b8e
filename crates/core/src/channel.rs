//! Notification channel trait: the abstraction over outbound messaging
//! platforms (email, WhatsApp).
//!
//! A channel delivers one rendered message to one recipient. Retry policy
//! and aggregation live in the dispatcher, not here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ChannelError;

/// Which rendering a channel expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Verbose rendering with a subject line.
    Email,
    /// Compact single-paragraph rendering.
    InstantMessage,
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    pub body: String,
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            subject: None,
            body: body.into(),
        }
    }

    pub fn with_subject(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            body: body.into(),
        }
    }
}

/// The core NotificationChannel trait.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name used in logs and audit records (e.g., "email", "whatsapp").
    fn name(&self) -> &str;

    fn kind(&self) -> ChannelKind;

    /// Deliver one message to one recipient.
    async fn send(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> std::result::Result<(), ChannelError>;

    /// Health check: are credentials present and the provider reachable?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}
