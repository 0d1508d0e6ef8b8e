//! HTTP API gateway for ProdOps.
//!
//! Exposes the chat endpoint, direct production and downtime lookups,
//! ticket administration, login, and a health check.
//!
//! Built on Axum. Every route except `/health` and `/auth/login` requires a
//! signed bearer token; the verified identity is attached to the request.

pub mod bootstrap;
pub mod error;
pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use prodops_core::{
    AuthError, DowntimeLookup, ProductionLookup, TicketRepository, TicketWriter, UserDirectory,
    UserIdentity,
};
use prodops_security::TokenSigner;
use prodops_workflow::WorkflowEngine;

pub use bootstrap::Services;
pub use error::ApiError;

/// Shared handler state.
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub production: Arc<dyn ProductionLookup>,
    pub downtime: Arc<dyn DowntimeLookup>,
    pub ticket_writer: Arc<dyn TicketWriter>,
    pub tickets: Arc<dyn TicketRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub signer: Arc<TokenSigner>,
    pub chat_limiter: Arc<RateLimiter>,
    pub ticket_limiter: Arc<RateLimiter>,
    pub database_configured: bool,
}

pub type SharedState = Arc<AppState>;

/// Build the router with all routes.
///
/// Layers applied:
/// - Bearer token authentication on everything but `/health` and `/auth/login`
/// - CORS restricted to `allowed_origins`
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/chat", post(routes::chat))
        .route("/production/daily", get(routes::production_daily))
        .route("/downtime/daily", get(routes::downtime_daily))
        .route("/tickets", get(routes::list_tickets).post(routes::create_ticket))
        .route("/tickets/{ticket_no}", get(routes::get_ticket))
        .route("/tickets/{ticket_no}/status", patch(routes::update_ticket_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(routes::health))
        .route("/auth/login", post(routes::login))
        .merge(protected)
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and the notification worker.
pub async fn start(services: Services) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", services.config.gateway.host, services.config.gateway.port);
    let worker = services.spawn_notification_worker();

    let state = Arc::new(services.app_state());
    let app = build_router(state, &services.config.gateway.allowed_origins);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    worker.abort();
    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key (the authenticated user id).
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    pub fn check(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        // Evict stale clients once the map grows large
        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Verify the bearer token and attach the [`UserIdentity`] to the request.
async fn auth_middleware(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    let claims = state.signer.verify(token).inspect_err(|e| {
        warn!(error = %e, path = %req.uri().path(), "Authentication failed");
    })?;

    let identity = UserIdentity::from(claims);
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
