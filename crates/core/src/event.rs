//! Ticket lifecycle events.
//!
//! The ticket writer publishes after its write commits. The notification
//! worker subscribes and delivers out of band, so delivery latency and
//! failures never reach whoever created the ticket.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::ticket::{StatusChange, TicketNo, TicketRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    TicketCreated(TicketRecord),
    TicketStatusChanged(StatusChange),
}

impl DomainEvent {
    pub fn ticket_no(&self) -> &TicketNo {
        match self {
            DomainEvent::TicketCreated(ticket) => &ticket.ticket_no,
            DomainEvent::TicketStatusChanged(change) => &change.ticket_no,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::TicketCreated(_) => "ticket_created",
            DomainEvent::TicketStatusChanged(_) => "ticket_status_changed",
        }
    }
}

/// Fan-out of [`DomainEvent`]s over `tokio::sync::broadcast`.
///
/// Slow subscribers lag and lose the oldest events rather than blocking
/// the publisher.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let kind = event.kind();
        let ticket_no = event.ticket_no().to_string();
        match self.sender.send(Arc::new(event)) {
            Ok(receivers) => receivers,
            Err(_) => {
                // The one-shot chat command runs without a worker
                tracing::debug!(kind, %ticket_no, "Event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
