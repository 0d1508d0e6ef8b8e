//! WhatsApp channel over the Twilio Messages API.

use async_trait::async_trait;
use prodops_config::NotificationConfig;
use prodops_core::error::ChannelError;
use prodops_core::{ChannelKind, NotificationChannel, OutboundMessage};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

const TWILIO_API: &str = "https://api.twilio.com";
const CHANNEL: &str = "whatsapp";
const PREFIX: &str = "whatsapp:";

/// Twilio WhatsApp channel. Sends only the message body; subjects are
/// dropped.
pub struct TwilioWhatsApp {
    client: reqwest::Client,
    base_url: String,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
}

#[derive(Deserialize)]
struct MessageCreated {
    #[serde(default)]
    sid: Option<String>,
}

/// Twilio addresses WhatsApp numbers as `whatsapp:+<number>`.
pub fn whatsapp_address(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with(PREFIX) {
        phone.to_string()
    } else {
        format!("{PREFIX}{phone}")
    }
}

impl TwilioWhatsApp {
    pub fn new(
        account_sid: Option<String>,
        auth_token: Option<String>,
        from_number: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::NotConfigured(format!("whatsapp client: {e}")))?;

        Ok(Self {
            client,
            base_url: TWILIO_API.to_string(),
            account_sid,
            auth_token,
            from_number,
        })
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, ChannelError> {
        Self::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_whatsapp_number.clone(),
            Duration::from_secs(config.send_timeout_secs),
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn credentials(&self) -> Result<(&str, &str, &str), ChannelError> {
        match (&self.account_sid, &self.auth_token, &self.from_number) {
            (Some(sid), Some(token), Some(from)) => Ok((sid.as_str(), token.as_str(), from.as_str())),
            _ => Err(ChannelError::NotConfigured(
                "TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_WHATSAPP_NUMBER must be set"
                    .into(),
            )),
        }
    }
}

impl std::fmt::Debug for TwilioWhatsApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioWhatsApp")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("from_number", &self.from_number)
            .finish()
    }
}

#[async_trait]
impl NotificationChannel for TwilioWhatsApp {
    fn name(&self) -> &str {
        CHANNEL
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::InstantMessage
    }

    async fn send(&self, recipient: &str, message: &OutboundMessage) -> Result<(), ChannelError> {
        let (sid, token, from) = self.credentials()?;
        let to = whatsapp_address(recipient);
        let from = whatsapp_address(from);
        let failed = |reason: String| ChannelError::DeliveryFailed {
            channel: CHANNEL.into(),
            recipient: to.clone(),
            reason,
        };

        let url = format!("{}/2010-04-01/Accounts/{sid}/Messages.json", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&[
                ("To", to.as_str()),
                ("From", from.as_str()),
                ("Body", message.body.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChannelError::Timeout {
                        channel: CHANNEL.into(),
                        recipient: to.clone(),
                    }
                } else {
                    failed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, recipient = %to, "Twilio rejected WhatsApp message");
            return Err(failed(format!("Twilio returned {status}: {body}")));
        }

        let created: MessageCreated = response.json().await.unwrap_or(MessageCreated { sid: None });
        debug!(recipient = %to, sid = ?created.sid, "WhatsApp message sent");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(self.credentials().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_gets_prefix_once() {
        assert_eq!(whatsapp_address("+918800000000"), "whatsapp:+918800000000");
        assert_eq!(whatsapp_address("whatsapp:+14155238886"), "whatsapp:+14155238886");
        assert_eq!(whatsapp_address(" +15550001111 "), "whatsapp:+15550001111");
    }

    #[tokio::test]
    async fn partial_credentials_are_not_configured() {
        let channel = TwilioWhatsApp::new(
            Some("AC123".into()),
            None,
            Some("+14155238886".into()),
            Duration::from_secs(1),
        )
        .unwrap();

        let err = channel
            .send("+15550001111", &OutboundMessage::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
        assert!(!channel.health_check().await.unwrap());
    }

    #[test]
    fn debug_redacts_token() {
        let channel = TwilioWhatsApp::new(
            Some("AC123".into()),
            Some("tw-secret".into()),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(!format!("{channel:?}").contains("tw-secret"));
    }
}
