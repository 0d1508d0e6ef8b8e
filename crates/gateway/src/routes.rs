//! Route handlers.
//!
//! - `GET   /health`                   : liveness
//! - `POST  /auth/login`               : exchange an email for a bearer token
//! - `POST  /chat`                     : run one workflow turn
//! - `GET   /production/daily`         : production summary for a line and date
//! - `GET   /downtime/daily`           : downtime breakdown for a line and date
//! - `GET   /tickets`                  : list tickets, newest first
//! - `POST  /tickets`                  : create a ticket (supervisor)
//! - `GET   /tickets/{no}`             : ticket details
//! - `PATCH /tickets/{no}/status`      : change status (maintenance or supervisor)

use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use prodops_core::identity::roles;
use prodops_core::{
    DowntimeEntry, NewTicket, ProductionSummary, Severity, StatusChange, TicketDetails,
    TicketLimit, TicketNo, TicketRecord, TicketStatus, UserIdentity, ValidationError,
};
use prodops_security::require_any_role;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::SharedState;
use crate::error::ApiError;

// ── Health ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database: if state.database_configured {
            "configured"
        } else {
            "not_configured"
        },
    })
}

// ── Auth ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    user: UserIdentity,
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmptyField("email").into());
    }

    let Some(user) = state.users.find_active_by_email(email).await? else {
        warn!(email, "Login for unknown or inactive user");
        return Err(ApiError::Unauthorized("User not found".into()));
    };

    let access_token = state.signer.issue(&user)?;
    info!(user_id = user.user_id, roles = ?user.roles, "User logged in");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        user,
    }))
}

// ── Chat ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    reply: String,
}

pub async fn chat(
    State(state): State<SharedState>,
    Extension(user): Extension<UserIdentity>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if !state.chat_limiter.check(&user.user_id.to_string()) {
        warn!(user_id = user.user_id, "Chat rate limit exceeded");
        return Err(ApiError::RateLimited);
    }

    let reply = state
        .engine
        .submit_turn(user.user_id, &user.roles, &req.message)
        .await?;
    Ok(Json(ChatResponse { reply }))
}

// ── Lookups ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DailyQuery {
    line_code: String,
    date: String,
}

impl DailyQuery {
    fn parse(&self) -> Result<(&str, NaiveDate), ValidationError> {
        let line = self.line_code.trim();
        if line.is_empty() {
            return Err(ValidationError::EmptyField("line_code"));
        }
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(self.date.clone()))?;
        Ok((line, date))
    }
}

pub async fn production_daily(
    State(state): State<SharedState>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<ProductionSummary>, ApiError> {
    let (line, date) = query.parse()?;
    state
        .production
        .production_summary(line, date)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No production data for {line} on {date}")))
}

pub async fn downtime_daily(
    State(state): State<SharedState>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<Vec<DowntimeEntry>>, ApiError> {
    let (line, date) = query.parse()?;
    Ok(Json(state.downtime.downtime_summary(line, date).await?))
}

// ── Tickets ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    limit: Option<i64>,
}

pub async fn list_tickets(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TicketDetails>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TicketStatus>)
        .transpose()?;
    let limit = match query.limit {
        Some(limit) => TicketLimit::new(limit)?,
        None => TicketLimit::default(),
    };
    Ok(Json(state.tickets.list_tickets(status, limit).await?))
}

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    line_code: String,
    issue: String,
    #[serde(default)]
    severity: Option<String>,
}

pub async fn create_ticket(
    State(state): State<SharedState>,
    Extension(user): Extension<UserIdentity>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketRecord>), ApiError> {
    require_any_role(&user, &[roles::SUPERVISOR])?;
    if !state.ticket_limiter.check(&user.user_id.to_string()) {
        warn!(user_id = user.user_id, "Ticket rate limit exceeded");
        return Err(ApiError::RateLimited);
    }

    let line_code = req.line_code.trim();
    let issue = req.issue.trim();
    if line_code.is_empty() {
        return Err(ValidationError::EmptyField("line_code").into());
    }
    if issue.is_empty() {
        return Err(ValidationError::EmptyField("issue").into());
    }
    let severity = match req.severity.as_deref() {
        Some(s) => s.parse::<Severity>()?,
        None => Severity::default(),
    };

    let ticket = state
        .ticket_writer
        .create_ticket(NewTicket {
            line_code: line_code.to_string(),
            issue_summary: issue.to_string(),
            severity,
            created_by_user_id: user.user_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    State(state): State<SharedState>,
    Path(ticket_no): Path<String>,
) -> Result<Json<TicketDetails>, ApiError> {
    let ticket_no = TicketNo::parse(&ticket_no)?;
    state
        .tickets
        .get_ticket(&ticket_no)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {ticket_no} not found")))
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    status: String,
}

pub async fn update_ticket_status(
    State(state): State<SharedState>,
    Extension(user): Extension<UserIdentity>,
    Path(ticket_no): Path<String>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<StatusChange>, ApiError> {
    require_any_role(&user, &[roles::MAINTENANCE, roles::SUPERVISOR])?;
    let ticket_no = TicketNo::parse(&ticket_no)?;
    let status: TicketStatus = req.status.parse()?;

    let change = state
        .tickets
        .update_status(&ticket_no, status)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {ticket_no} not found")))?;

    info!(
        user_id = user.user_id,
        ticket_no = %change.ticket_no,
        old = %change.old_status,
        new = %change.new_status,
        "Ticket status updated"
    );
    Ok(Json(change))
}
