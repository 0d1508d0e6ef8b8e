//! Router tests driven through `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{NaiveDate, Utc};
use http_body_util::BodyExt;
use prodops_config::{SafetyConfig, WorkflowConfig};
use prodops_core::error::CapabilityError;
use prodops_core::{
    DowntimeEntry, DowntimeLookup, KnowledgeSearch, LanguageModel, NewTicket, ProductionLookup,
    ProductionSummary, Severity, StatusChange, TicketDetails, TicketLimit, TicketNo,
    TicketRecord, TicketRepository, TicketStatus, TicketWriter, UserDirectory, UserIdentity,
};
use prodops_gateway::{AppState, RateLimiter, SharedState, build_router};
use prodops_memory::InMemoryStore;
use prodops_security::{SafetyFilter, TokenSigner};
use prodops_workflow::{CAPABILITIES_REPLY, Capabilities, WorkflowEngine};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

struct StubModel;

#[async_trait]
impl LanguageModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        if prompt.contains("SAFE or UNSAFE") {
            Ok("SAFE".into())
        } else if prompt.contains("Classify the user intent") {
            Ok("UNKNOWN".into())
        } else {
            Ok(String::new())
        }
    }
}

/// One stub standing in for every data capability.
#[derive(Default)]
struct StubPlant {
    created: Mutex<Vec<NewTicket>>,
    status_updates: Mutex<Vec<(TicketNo, TicketStatus)>>,
}

fn known_ticket() -> TicketNo {
    TicketNo::parse("TKT-AAAAAA").unwrap()
}

#[async_trait]
impl ProductionLookup for StubPlant {
    async fn production_summary(
        &self,
        line_code: &str,
        date: NaiveDate,
    ) -> Result<Option<ProductionSummary>, CapabilityError> {
        Ok((line_code == "LINE-1").then(|| ProductionSummary {
            line_code: line_code.into(),
            production_date: date,
            total_good: 400,
            total_reject: 12,
        }))
    }
}

#[async_trait]
impl DowntimeLookup for StubPlant {
    async fn downtime_summary(
        &self,
        _line_code: &str,
        _date: NaiveDate,
    ) -> Result<Vec<DowntimeEntry>, CapabilityError> {
        Ok(vec![DowntimeEntry {
            reason_code: "MECH".into(),
            reason_text: "Mechanical failure".into(),
            downtime_minutes: 30.0,
        }])
    }
}

#[async_trait]
impl TicketWriter for StubPlant {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<TicketRecord, CapabilityError> {
        let severity = ticket.severity;
        self.created.lock().unwrap().push(ticket);
        Ok(TicketRecord {
            id: 1,
            ticket_no: known_ticket(),
            severity,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl TicketRepository for StubPlant {
    async fn get_ticket(
        &self,
        ticket_no: &TicketNo,
    ) -> Result<Option<TicketDetails>, CapabilityError> {
        Ok((*ticket_no == known_ticket()).then(|| TicketDetails {
            ticket_no: known_ticket(),
            issue_summary: "Conveyor belt torn".into(),
            severity: Severity::High,
            status: TicketStatus::Open,
            created_at: Utc::now(),
            created_by: "Sam Supervisor".into(),
        }))
    }

    async fn list_tickets(
        &self,
        _status: Option<TicketStatus>,
        _limit: TicketLimit,
    ) -> Result<Vec<TicketDetails>, CapabilityError> {
        Ok(self.get_ticket(&known_ticket()).await?.into_iter().collect())
    }

    async fn update_status(
        &self,
        ticket_no: &TicketNo,
        status: TicketStatus,
    ) -> Result<Option<StatusChange>, CapabilityError> {
        if *ticket_no != known_ticket() {
            return Ok(None);
        }
        self.status_updates
            .lock()
            .unwrap()
            .push((ticket_no.clone(), status));
        Ok(Some(StatusChange {
            ticket_no: ticket_no.clone(),
            old_status: TicketStatus::Open,
            new_status: status,
        }))
    }
}

#[async_trait]
impl UserDirectory for StubPlant {
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserIdentity>, CapabilityError> {
        Ok((email == "sup@plant.example").then(|| supervisor()))
    }
}

#[async_trait]
impl KnowledgeSearch for StubPlant {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<String>, CapabilityError> {
        Ok(vec![])
    }
}

fn user(id: i64, roles: &[&str]) -> UserIdentity {
    UserIdentity {
        user_id: id,
        email: format!("user{id}@plant.example"),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

fn supervisor() -> UserIdentity {
    UserIdentity {
        email: "sup@plant.example".into(),
        ..user(1, &["SUPERVISOR"])
    }
}

struct TestApp {
    state: SharedState,
    plant: Arc<StubPlant>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_chat_limit(30)
    }

    fn with_chat_limit(chat_limit: usize) -> Self {
        let plant = Arc::new(StubPlant::default());
        let model: Arc<dyn LanguageModel> = Arc::new(StubModel);
        let engine = WorkflowEngine::new(
            Capabilities {
                model: model.clone(),
                production: plant.clone(),
                downtime: plant.clone(),
                tickets: plant.clone(),
                knowledge: plant.clone(),
            },
            Arc::new(InMemoryStore::new()),
            SafetyFilter::new(model, &SafetyConfig::default()),
            WorkflowConfig::default(),
        );

        let state = Arc::new(AppState {
            engine: Arc::new(engine),
            production: plant.clone(),
            downtime: plant.clone(),
            ticket_writer: plant.clone(),
            tickets: plant.clone(),
            users: plant.clone(),
            signer: Arc::new(TokenSigner::new("test-secret", chrono::Duration::minutes(5))),
            chat_limiter: Arc::new(RateLimiter::per_minute(chat_limit)),
            ticket_limiter: Arc::new(RateLimiter::per_minute(10)),
            database_configured: false,
        });
        Self { state, plant }
    }

    fn token(&self, identity: &UserIdentity) -> String {
        self.state.signer.issue(identity).unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(self.state.clone(), &[])
            .oneshot(req)
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str, as_user: Option<&UserIdentity>) -> (StatusCode, Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(identity) = as_user {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", self.token(identity)));
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        as_user: Option<&UserIdentity>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(identity) = as_user {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", self.token(identity)));
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "not_configured");
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = TestApp::new();
    let (status, body) = app.json("POST", "/chat", None, json!({"message": "hi"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, _) = app.get("/tickets", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let app = TestApp::new();
    let other = TokenSigner::new("another-secret", chrono::Duration::minutes(5));
    let forged = other.issue(&supervisor()).unwrap();

    let req = Request::builder()
        .uri("/tickets")
        .header(header::AUTHORIZATION, format!("Bearer {forged}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid or expired token");
}

#[tokio::test]
async fn login_then_chat() {
    let app = TestApp::new();

    let (status, body) = app
        .json("POST", "/auth/login", None, json!({"email": "nobody@plant.example"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "User not found");

    let (status, body) = app
        .json("POST", "/auth/login", None, json!({"email": "sup@plant.example"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["roles"][0], "SUPERVISOR");
    let token = body["access_token"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(json!({"message": "What can you do?"}).to_string()))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], CAPABILITIES_REPLY);
}

#[tokio::test]
async fn chat_validates_message() {
    let app = TestApp::new();
    let operator = user(2, &["OPERATOR"]);

    let (status, _) = app.json("POST", "/chat", Some(&operator), json!({"message": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long = "x".repeat(1001);
    let (status, _) = app.json("POST", "/chat", Some(&operator), json!({"message": long})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_is_rate_limited_per_user() {
    let app = TestApp::with_chat_limit(2);
    let alice = user(2, &[]);
    let bob = user(3, &[]);

    for _ in 0..2 {
        let (status, _) = app.json("POST", "/chat", Some(&alice), json!({"message": "hi"})).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app.json("POST", "/chat", Some(&alice), json!({"message": "hi"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _) = app.json("POST", "/chat", Some(&bob), json!({"message": "hi"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ticket_creation_is_supervisor_only() {
    let app = TestApp::new();
    let body = json!({"line_code": "LINE-2", "issue": "Hydraulic leak", "severity": "High"});

    let (status, resp) = app
        .json("POST", "/tickets", Some(&user(2, &["OPERATOR", "MAINTENANCE"])), body.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(resp["detail"].as_str().unwrap().contains("SUPERVISOR"));
    assert!(app.plant.created.lock().unwrap().is_empty());

    let (status, resp) = app.json("POST", "/tickets", Some(&supervisor()), body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["ticket_no"], "TKT-AAAAAA");
    assert_eq!(resp["severity"], "High");

    let created = app.plant.created.lock().unwrap();
    assert_eq!(created[0].created_by_user_id, 1);
    assert_eq!(created[0].line_code, "LINE-2");
}

#[tokio::test]
async fn ticket_creation_validates_fields() {
    let app = TestApp::new();
    let (status, _) = app
        .json(
            "POST",
            "/tickets",
            Some(&supervisor()),
            json!({"line_code": "LINE-2", "issue": "Leak", "severity": "Apocalyptic"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json("POST", "/tickets", Some(&supervisor()), json!({"line_code": "LINE-2", "issue": " "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ticket_lookup() {
    let app = TestApp::new();
    let operator = user(2, &["OPERATOR"]);

    let (status, _) = app.get("/tickets/NOT-A-TICKET", Some(&operator)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/tickets/TKT-BBBBBB", Some(&operator)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/tickets/TKT-AAAAAA", Some(&operator)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created_by"], "Sam Supervisor");
}

#[tokio::test]
async fn ticket_listing_validates_query() {
    let app = TestApp::new();
    let operator = user(2, &["OPERATOR"]);

    let (status, _) = app.get("/tickets?limit=0", Some(&operator)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/tickets?limit=101", Some(&operator)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/tickets?status=DONE", Some(&operator)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .get("/tickets?status=OPEN&limit=10", Some(&operator))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn status_update_requires_maintenance_or_supervisor() {
    let app = TestApp::new();
    let body = json!({"status": "IN_PROGRESS"});

    let (status, _) = app
        .json("PATCH", "/tickets/TKT-AAAAAA/status", Some(&user(2, &["OPERATOR"])), body.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = app
        .json("PATCH", "/tickets/TKT-AAAAAA/status", Some(&user(4, &["MAINTENANCE"])), body.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["old_status"], "OPEN");
    assert_eq!(resp["new_status"], "IN_PROGRESS");

    let (status, _) = app
        .json("PATCH", "/tickets/TKT-BBBBBB/status", Some(&supervisor()), body)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json("PATCH", "/tickets/TKT-AAAAAA/status", Some(&supervisor()), json!({"status": "DONE"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.plant.status_updates.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn daily_lookups() {
    let app = TestApp::new();
    let operator = user(2, &["OPERATOR"]);

    let (status, body) = app
        .get("/production/daily?line_code=LINE-1&date=2026-01-10", Some(&operator))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_good"], 400);

    let (status, _) = app
        .get("/production/daily?line_code=LINE-9&date=2026-01-10", Some(&operator))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get("/production/daily?line_code=LINE-1&date=yesterday", Some(&operator))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("YYYY-MM-DD"));

    let (status, body) = app
        .get("/downtime/daily?line_code=LINE-1&date=2026-01-10", Some(&operator))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["reason_code"], "MECH");
}
