//! Background notification worker.
//!
//! Subscribes to the domain event bus and dispatches each ticket event on
//! its own task, so slow deliveries and retries never hold up the writer
//! or each other. Short-lived callers that cannot keep a worker alive use
//! [`deliver_pending`] instead.

use prodops_core::{DomainEvent, EventBus};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatcher::NotificationDispatcher;

async fn handle_event(dispatcher: &NotificationDispatcher, event: &DomainEvent) {
    match event {
        DomainEvent::TicketCreated(ticket) => {
            dispatcher.dispatch(ticket).await;
        }
        DomainEvent::TicketStatusChanged(change) => {
            dispatcher.status_changed(change).await;
        }
    }
}

/// Start the worker. It stops when the event bus is dropped.
pub fn spawn_notification_worker(
    dispatcher: Arc<NotificationDispatcher>,
    bus: &EventBus,
) -> JoinHandle<()> {
    let mut events = bus.subscribe();

    tokio::spawn(async move {
        info!(channels = %dispatcher.channel_label(), "Notification worker started");
        loop {
            match events.recv().await {
                Ok(event) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move { handle_event(&dispatcher, &event).await });
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification worker lagged, events dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("Event bus closed");
                    break;
                }
            }
        }
        info!("Notification worker stopped");
    })
}

/// Dispatch every event already queued on `events`, one after another, and
/// return once all deliveries and audit writes have finished.
///
/// Returns the number of events handled.
pub async fn deliver_pending(
    dispatcher: &NotificationDispatcher,
    events: &mut Receiver<Arc<DomainEvent>>,
) -> usize {
    let mut handled = 0;
    loop {
        match events.try_recv() {
            Ok(event) => {
                handle_event(dispatcher, &event).await;
                handled += 1;
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Pending notifications lagged, events dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    if handled > 0 {
        debug!(handled, "Pending notifications delivered");
    }
    handled
}
