//! Outbound notifications for ProdOps.
//!
//! Ticket events are rendered per channel, delivered with per-channel retry,
//! aggregated into one outcome, and written to an audit log.
//!
//! Available channels:
//! - **Email**: SendGrid v3 mail API, verbose rendering, retried
//! - **WhatsApp**: Twilio Messages API, compact rendering, single attempt

pub mod audit;
pub mod dispatcher;
pub mod email;
pub mod render;
pub mod retry;
pub mod whatsapp;
pub mod worker;

#[cfg(feature = "postgres")]
pub use audit::PgAuditLog;
pub use audit::InMemoryAuditLog;
pub use dispatcher::{BatchReport, ChannelTarget, NotificationDispatcher};
pub use email::SendGridEmail;
pub use retry::RetryPolicy;
pub use whatsapp::{TwilioWhatsApp, whatsapp_address};
pub use worker::{deliver_pending, spawn_notification_worker};
