//! Notification dispatcher.
//!
//! Fans one ticket event out to every configured channel. Channels run
//! concurrently, recipients within a channel run concurrently, and each
//! recipient's attempts run in sequence under that channel's [`RetryPolicy`].
//! The per-recipient results are folded into one [`NotificationOutcome`]
//! which is written to the audit log exactly once.

use futures::future::join_all;
use prodops_config::NotificationConfig;
use prodops_core::error::ChannelError;
use prodops_core::{
    ChannelKind, DeliveryStatus, NotificationAuditLog, NotificationChannel, NotificationOutcome,
    OutboundMessage, StatusChange, TicketRecord,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::email::SendGridEmail;
use crate::render;
use crate::retry::RetryPolicy;
use crate::whatsapp::TwilioWhatsApp;

/// A channel with its recipients and retry policy.
pub struct ChannelTarget {
    pub channel: Arc<dyn NotificationChannel>,
    pub recipients: Vec<String>,
    pub retry: RetryPolicy,
}

/// Delivery counts for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub channel: String,
    pub attempted: usize,
    pub delivered: usize,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

pub struct NotificationDispatcher {
    targets: Vec<ChannelTarget>,
    audit: Arc<dyn NotificationAuditLog>,
}

impl NotificationDispatcher {
    pub fn new(audit: Arc<dyn NotificationAuditLog>) -> Self {
        Self {
            targets: Vec::new(),
            audit,
        }
    }

    /// Register a channel.
    pub fn with_channel(
        mut self,
        channel: Arc<dyn NotificationChannel>,
        recipients: Vec<String>,
        retry: RetryPolicy,
    ) -> Self {
        info!(channel = channel.name(), recipients = recipients.len(), "Registered notification channel");
        self.targets.push(ChannelTarget {
            channel,
            recipients,
            retry,
        });
        self
    }

    /// Email with the configured retry policy, WhatsApp with a single attempt.
    pub fn from_config(
        config: &NotificationConfig,
        audit: Arc<dyn NotificationAuditLog>,
    ) -> Result<Self, ChannelError> {
        let email = SendGridEmail::from_config(config)?;
        let whatsapp = TwilioWhatsApp::from_config(config)?;

        Ok(Self::new(audit)
            .with_channel(
                Arc::new(email),
                config.email_recipients.clone(),
                RetryPolicy::fixed(
                    config.email_max_attempts,
                    Duration::from_secs(config.email_backoff_secs),
                ),
            )
            .with_channel(
                Arc::new(whatsapp),
                config.whatsapp_recipients.clone(),
                RetryPolicy::once(),
            ))
    }

    /// Every registered channel, e.g. `EMAIL+WHATSAPP`.
    pub fn channel_label(&self) -> String {
        self.targets
            .iter()
            .map(|t| t.channel.name().to_uppercase())
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Notify every channel about a new ticket. Never fails: delivery and
    /// audit errors are logged and folded into the returned outcome.
    pub async fn dispatch(&self, ticket: &TicketRecord) -> NotificationOutcome {
        let batches = self.targets.iter().map(|target| {
            let message = render::ticket_created(target.channel.kind(), ticket);
            async move { deliver_batch(target, &message, target.retry).await }
        });
        let reports = join_all(batches).await;

        let attempted = reports.iter().map(|r| r.attempted).sum();
        let failed = reports.iter().map(BatchReport::failed).sum();
        let outcome = NotificationOutcome {
            ticket_id: ticket.id,
            channel: attempted_label(&reports),
            recipient_summary: summarize(&reports),
            status: DeliveryStatus::aggregate(attempted, failed),
        };

        info!(
            ticket_no = %ticket.ticket_no,
            status = %outcome.status,
            summary = %outcome.recipient_summary,
            "Ticket notification dispatched"
        );

        if let Err(e) = self.audit.record(&outcome).await {
            error!(ticket_id = ticket.id, error = %e, "Failed to write notification audit record");
        }
        outcome
    }

    /// Tell instant-message recipients about a status change. One attempt,
    /// no audit record. Returns the number of recipients reached.
    pub async fn status_changed(&self, change: &StatusChange) -> usize {
        let message = render::status_changed_compact(change);
        let batches = self
            .targets
            .iter()
            .filter(|t| t.channel.kind() == ChannelKind::InstantMessage)
            .map(|target| deliver_batch(target, &message, RetryPolicy::once()));
        let reports = join_all(batches).await;

        let delivered = reports.iter().map(|r| r.delivered).sum();
        info!(
            ticket_no = %change.ticket_no,
            new_status = %change.new_status,
            delivered,
            "Status change notification sent"
        );
        delivered
    }
}

async fn deliver_batch(
    target: &ChannelTarget,
    message: &OutboundMessage,
    retry: RetryPolicy,
) -> BatchReport {
    let channel = target.channel.name();
    let sends = target.recipients.iter().map(|recipient| async move {
        let result = retry
            .run(channel, |attempt| {
                debug!(channel, recipient = %recipient, attempt, "Sending notification");
                target.channel.send(recipient, message)
            })
            .await;
        if let Err(e) = &result {
            warn!(channel, recipient = %recipient, error = %e, "Notification delivery failed");
        }
        result.is_ok()
    });
    let results = join_all(sends).await;

    BatchReport {
        channel: channel.to_uppercase(),
        attempted: results.len(),
        delivered: results.iter().filter(|ok| **ok).count(),
    }
}

/// Channels that had at least one recipient, e.g. `EMAIL+WHATSAPP`.
/// `NONE` when no channel had recipients.
fn attempted_label(reports: &[BatchReport]) -> String {
    let label = reports
        .iter()
        .filter(|r| r.attempted > 0)
        .map(|r| r.channel.as_str())
        .collect::<Vec<_>>()
        .join("+");
    if label.is_empty() { "NONE".into() } else { label }
}

/// `EMAIL 1/1, WHATSAPP 0/1`
fn summarize(reports: &[BatchReport]) -> String {
    reports
        .iter()
        .map(|r| format!("{} {}/{}", r.channel, r.delivered, r.attempted))
        .collect::<Vec<_>>()
        .join(", ")
}
