//! Stand-in for the relational capabilities when no database is configured.
//!
//! Every call fails with [`CapabilityError::NotConfigured`], which the
//! workflow turns into its generic failure reply. Knowledge questions and
//! blocked input still work without a database.

use async_trait::async_trait;
use chrono::NaiveDate;

use prodops_core::error::CapabilityError;
use prodops_core::{
    DowntimeEntry, DowntimeLookup, NewTicket, ProductionLookup, ProductionSummary,
    StatusChange, TicketDetails, TicketLimit, TicketNo, TicketRecord, TicketRepository,
    TicketStatus, TicketWriter, UserDirectory, UserIdentity,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

fn not_configured(capability: &str) -> CapabilityError {
    CapabilityError::NotConfigured {
        capability: capability.into(),
        reason: "database.url is not set".into(),
    }
}

#[async_trait]
impl ProductionLookup for Unconfigured {
    async fn production_summary(
        &self,
        _line_code: &str,
        _date: NaiveDate,
    ) -> Result<Option<ProductionSummary>, CapabilityError> {
        Err(not_configured("production_lookup"))
    }
}

#[async_trait]
impl DowntimeLookup for Unconfigured {
    async fn downtime_summary(
        &self,
        _line_code: &str,
        _date: NaiveDate,
    ) -> Result<Vec<DowntimeEntry>, CapabilityError> {
        Err(not_configured("downtime_lookup"))
    }
}

#[async_trait]
impl TicketWriter for Unconfigured {
    async fn create_ticket(&self, _ticket: NewTicket) -> Result<TicketRecord, CapabilityError> {
        Err(not_configured("ticket_writer"))
    }
}

#[async_trait]
impl TicketRepository for Unconfigured {
    async fn get_ticket(
        &self,
        _ticket_no: &TicketNo,
    ) -> Result<Option<TicketDetails>, CapabilityError> {
        Err(not_configured("ticket_repository"))
    }

    async fn list_tickets(
        &self,
        _status: Option<TicketStatus>,
        _limit: TicketLimit,
    ) -> Result<Vec<TicketDetails>, CapabilityError> {
        Err(not_configured("ticket_repository"))
    }

    async fn update_status(
        &self,
        _ticket_no: &TicketNo,
        _new_status: TicketStatus,
    ) -> Result<Option<StatusChange>, CapabilityError> {
        Err(not_configured("ticket_repository"))
    }
}

#[async_trait]
impl UserDirectory for Unconfigured {
    async fn find_active_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<UserIdentity>, CapabilityError> {
        Err(not_configured("user_directory"))
    }
}
