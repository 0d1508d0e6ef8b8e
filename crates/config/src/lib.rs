//! Configuration loading, validation, and management for ProdOps.
//!
//! Loads configuration from `~/.prodops/config.toml` (or an explicit path)
//! with environment variable overrides for connection strings and secrets.
//! Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.prodops/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relational store connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Language model endpoint
    #[serde(default)]
    pub llm: LlmConfig,

    /// Workflow engine behavior
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Input safety filter
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Knowledge base documents
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Notification recipients, retry policy, and channel credentials
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

// ── Database ────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string. `None` runs with in-memory stores only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply the bundled migrations at startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact(&self.url))
            .field("max_connections", &self.max_connections)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

// ── Gateway ─────────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Chat requests allowed per user per minute
    #[serde(default = "default_chat_rate")]
    pub chat_rate_per_minute: usize,

    /// Ticket creations allowed per user per minute
    #[serde(default = "default_ticket_rate")]
    pub ticket_rate_per_minute: usize,

    /// Secret used to sign HS256 bearer tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,

    /// Origins allowed by CORS. Empty = same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_chat_rate() -> usize {
    30
}
fn default_ticket_rate() -> usize {
    10
}
fn default_token_ttl() -> i64 {
    60 * 12
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            chat_rate_per_minute: default_chat_rate(),
            ticket_rate_per_minute: default_ticket_rate(),
            token_secret: None,
            token_ttl_minutes: default_token_ttl(),
            allowed_origins: vec![],
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("chat_rate_per_minute", &self.chat_rate_per_minute)
            .field("ticket_rate_per_minute", &self.ticket_rate_per_minute)
            .field("token_secret", &redact(&self.token_secret))
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

// ── Language model ──────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: 0.0,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ── Workflow ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Line used when the request names none (or extraction fails)
    #[serde(default = "default_line")]
    pub default_line: String,

    /// Role required to create tickets from chat
    #[serde(default = "default_supervisor_role")]
    pub supervisor_role: String,

    /// Timeout applied to every capability call within a turn
    #[serde(default = "default_capability_timeout")]
    pub capability_timeout_secs: u64,

    /// Characters of the last reply kept in user memory
    #[serde(default = "default_memory_response_chars")]
    pub memory_response_chars: usize,

    /// Snippets requested from knowledge search
    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,

    /// Serialize memory read-modify-write per user
    #[serde(default)]
    pub serialize_user_turns: bool,
}

fn default_line() -> String {
    "LINE-1".into()
}
fn default_supervisor_role() -> String {
    "SUPERVISOR".into()
}
fn default_capability_timeout() -> u64 {
    30
}
fn default_memory_response_chars() -> usize {
    200
}
fn default_knowledge_top_k() -> usize {
    3
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_line: default_line(),
            supervisor_role: default_supervisor_role(),
            capability_timeout_secs: default_capability_timeout(),
            memory_response_chars: default_memory_response_chars(),
            knowledge_top_k: default_knowledge_top_k(),
            serialize_user_turns: false,
        }
    }
}

// ── Safety ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Patterns appended to the built-in denylist
    #[serde(default)]
    pub extra_patterns: Vec<String>,

    /// Inputs shorter than this pass when the model check is unavailable
    #[serde(default = "default_short_input_chars")]
    pub short_input_chars: usize,
}

fn default_short_input_chars() -> usize {
    500
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            extra_patterns: vec![],
            short_input_chars: default_short_input_chars(),
        }
    }
}

// ── Knowledge ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory of markdown documents
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// Maximum characters per indexed chunk
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
}

fn default_docs_dir() -> String {
    "data/docs".into()
}
fn default_chunk_chars() -> usize {
    800
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            chunk_chars: default_chunk_chars(),
        }
    }
}

// ── Notifications ───────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub email_recipients: Vec<String>,

    #[serde(default)]
    pub whatsapp_recipients: Vec<String>,

    /// Total attempts per email recipient (first try included)
    #[serde(default = "default_email_attempts")]
    pub email_max_attempts: u32,

    /// Fixed wait between email attempts
    #[serde(default = "default_email_backoff")]
    pub email_backoff_secs: u64,

    /// Timeout for one provider HTTP call
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sendgrid_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_account_sid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_auth_token: Option<String>,

    /// Sender number, e.g. `whatsapp:+14155238886`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twilio_whatsapp_number: Option<String>,
}

fn default_email_attempts() -> u32 {
    3
}
fn default_email_backoff() -> u64 {
    2
}
fn default_send_timeout() -> u64 {
    10
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_recipients: vec![],
            whatsapp_recipients: vec![],
            email_max_attempts: default_email_attempts(),
            email_backoff_secs: default_email_backoff(),
            send_timeout_secs: default_send_timeout(),
            sendgrid_api_key: None,
            email_from: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_whatsapp_number: None,
        }
    }
}

impl std::fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("email_recipients", &self.email_recipients)
            .field("whatsapp_recipients", &self.whatsapp_recipients)
            .field("email_max_attempts", &self.email_max_attempts)
            .field("email_backoff_secs", &self.email_backoff_secs)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .field("sendgrid_api_key", &redact(&self.sendgrid_api_key))
            .field("email_from", &self.email_from)
            .field("twilio_account_sid", &redact(&self.twilio_account_sid))
            .field("twilio_auth_token", &redact(&self.twilio_auth_token))
            .field("twilio_whatsapp_number", &self.twilio_whatsapp_number)
            .finish()
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from the default path (~/.prodops/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from a specific path, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no env overrides).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Fill secrets and connection strings from the environment.
    ///
    /// Environment values win over the file for `DATABASE_URL`; secrets from
    /// the environment only fill fields the file leaves empty.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(port) = lookup("PRODOPS_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }

        let fill = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                *slot = lookup(key);
            }
        };
        fill(&mut self.gateway.token_secret, "PRODOPS_TOKEN_SECRET");
        fill(&mut self.llm.api_key, "OPENAI_API_KEY");
        fill(&mut self.notifications.sendgrid_api_key, "SENDGRID_API_KEY");
        fill(&mut self.notifications.email_from, "EMAIL_FROM");
        fill(&mut self.notifications.twilio_account_sid, "TWILIO_ACCOUNT_SID");
        fill(&mut self.notifications.twilio_auth_token, "TWILIO_AUTH_TOKEN");
        fill(
            &mut self.notifications.twilio_whatsapp_number,
            "TWILIO_WHATSAPP_NUMBER",
        );
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".prodops")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.notifications.email_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "notifications.email_max_attempts must be at least 1".into(),
            ));
        }
        if self.workflow.capability_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.capability_timeout_secs must be > 0".into(),
            ));
        }
        if self.workflow.knowledge_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.knowledge_top_k must be > 0".into(),
            ));
        }
        if self.workflow.default_line.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "workflow.default_line must not be empty".into(),
            ));
        }
        if self.gateway.chat_rate_per_minute == 0 || self.gateway.ticket_rate_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "gateway rate limits must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Render the configuration as TOML with secrets removed.
    pub fn redacted_toml(&self) -> String {
        let mut copy = self.clone();
        let mask = |slot: &mut Option<String>| {
            if slot.is_some() {
                *slot = Some("[REDACTED]".into());
            }
        };
        mask(&mut copy.database.url);
        mask(&mut copy.gateway.token_secret);
        mask(&mut copy.llm.api_key);
        mask(&mut copy.notifications.sendgrid_api_key);
        mask(&mut copy.notifications.twilio_account_sid);
        mask(&mut copy.notifications.twilio_auth_token);
        toml::to_string_pretty(&copy).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
