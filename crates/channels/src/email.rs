//! Email channel over the SendGrid v3 mail API.

use async_trait::async_trait;
use prodops_config::NotificationConfig;
use prodops_core::error::ChannelError;
use prodops_core::{ChannelKind, NotificationChannel, OutboundMessage};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const CHANNEL: &str = "email";

/// SendGrid email channel.
///
/// Missing credentials do not fail construction; every send then fails
/// with [`ChannelError::NotConfigured`] so the outcome is still audited.
pub struct SendGridEmail {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    from: Option<String>,
}

impl SendGridEmail {
    pub fn new(
        api_key: Option<String>,
        from: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::NotConfigured(format!("email client: {e}")))?;

        Ok(Self {
            client,
            endpoint: SENDGRID_URL.to_string(),
            api_key,
            from,
        })
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, ChannelError> {
        Self::new(
            config.sendgrid_api_key.clone(),
            config.email_from.clone(),
            Duration::from_secs(config.send_timeout_secs),
        )
    }

    /// Point at a different API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn credentials(&self) -> Result<(&str, &str), ChannelError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("SENDGRID_API_KEY is not set".into()))?;
        let from = self
            .from
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("EMAIL_FROM is not set".into()))?;
        Ok((key, from))
    }
}

impl std::fmt::Debug for SendGridEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridEmail")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .finish()
    }
}

/// Build the SendGrid request body for one recipient.
pub(crate) fn sendgrid_payload(to: &str, from: &str, message: &OutboundMessage) -> Value {
    json!({
        "personalizations": [{
            "to": [{ "email": to }],
            "subject": message.subject.as_deref().unwrap_or_default(),
        }],
        "from": { "email": from },
        "content": [{ "type": "text/plain", "value": message.body }],
    })
}

#[async_trait]
impl NotificationChannel for SendGridEmail {
    fn name(&self) -> &str {
        CHANNEL
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<(), ChannelError> {
        let (key, from) = self.credentials()?;
        let failed = |reason: String| ChannelError::DeliveryFailed {
            channel: CHANNEL.into(),
            recipient: recipient.into(),
            reason,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&sendgrid_payload(recipient, from, message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::Timeout {
                        channel: CHANNEL.into(),
                        recipient: recipient.into(),
                    }
                } else {
                    failed(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, recipient, "SendGrid rejected email");
            return Err(failed(format!("SendGrid returned {status}: {body}")));
        }

        debug!(recipient, "Email sent");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(self.credentials().is_ok())
    }
}
