//! Message rendering per channel kind.
//!
//! Email gets a subject and a multi-line body; instant messages get one
//! compact line.

use prodops_core::{ChannelKind, OutboundMessage, StatusChange, TicketRecord};

/// Render a ticket-created notification for a channel kind.
pub fn ticket_created(kind: ChannelKind, ticket: &TicketRecord) -> OutboundMessage {
    match kind {
        ChannelKind::Email => ticket_created_email(ticket),
        ChannelKind::InstantMessage => ticket_created_compact(ticket),
    }
}

pub fn ticket_created_email(ticket: &TicketRecord) -> OutboundMessage {
    let body = format!(
        "A new maintenance ticket was created.\n\n\
         Ticket Number: {}\n\
         Severity: {}\n\
         Status: {}\n\
         Created At: {}\n",
        ticket.ticket_no,
        ticket.severity,
        ticket.status,
        ticket.created_at.format("%Y-%m-%d %H:%M UTC"),
    );
    OutboundMessage::with_subject(format!("New Ticket Created: {}", ticket.ticket_no), body)
}

pub fn ticket_created_compact(ticket: &TicketRecord) -> OutboundMessage {
    OutboundMessage::text(format!(
        "New ticket {} | Severity: {} | Status: {}",
        ticket.ticket_no, ticket.severity, ticket.status
    ))
}

pub fn status_changed_compact(change: &StatusChange) -> OutboundMessage {
    OutboundMessage::text(format!(
        "Ticket {} status changed: {} -> {}",
        change.ticket_no, change.old_status, change.new_status
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prodops_core::{Severity, TicketNo, TicketStatus};

    fn ticket() -> TicketRecord {
        TicketRecord {
            id: 11,
            ticket_no: TicketNo::parse("TKT-9F8E7D").unwrap(),
            severity: Severity::High,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn email_is_verbose_with_subject() {
        let msg = ticket_created(ChannelKind::Email, &ticket());
        assert_eq!(msg.subject.as_deref(), Some("New Ticket Created: TKT-9F8E7D"));
        assert!(msg.body.contains("Ticket Number: TKT-9F8E7D"));
        assert!(msg.body.contains("Severity: High"));
        assert!(msg.body.contains("Status: OPEN"));
    }

    #[test]
    fn instant_message_is_one_line() {
        let msg = ticket_created(ChannelKind::InstantMessage, &ticket());
        assert!(msg.subject.is_none());
        assert!(!msg.body.contains('\n'));
        assert!(msg.body.contains("TKT-9F8E7D"));
    }

    #[test]
    fn status_change_names_both_states() {
        let msg = status_changed_compact(&StatusChange {
            ticket_no: TicketNo::parse("TKT-9F8E7D").unwrap(),
            old_status: TicketStatus::Open,
            new_status: TicketStatus::InProgress,
        });
        assert_eq!(msg.body, "Ticket TKT-9F8E7D status changed: OPEN -> IN_PROGRESS");
    }
}
