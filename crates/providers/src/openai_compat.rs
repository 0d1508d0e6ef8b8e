//! OpenAI-compatible language model.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/v1/chat/completions`. Each prompt is sent as a single user message;
//! no history, no streaming, no tools.

use async_trait::async_trait;
use prodops_config::LlmConfig;
use prodops_core::error::CapabilityError;
use prodops_core::LanguageModel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const CAPABILITY: &str = "language_model";

/// A language model reached over an OpenAI-compatible HTTP API.
pub struct OpenAiCompatModel {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    /// Create a new model client.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::unavailable(CAPABILITY, e.to_string()))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
            client,
        })
    }

    /// Build from the `[llm]` configuration section.
    pub fn from_config(config: &LlmConfig) -> Result<Self, CapabilityError> {
        let api_key = config.api_key.clone().ok_or_else(|| CapabilityError::NotConfigured {
            capability: CAPABILITY.into(),
            reason: "llm.api_key (or OPENAI_API_KEY) is not set".into(),
        })?;

        Ok(Self::new(
            "openai",
            &config.api_url,
            api_key,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_temperature(config.temperature))
    }

    /// Create an Ollama model (convenience constructor).
    pub fn ollama(model: impl Into<String>, base_url: Option<&str>) -> Result<Self, CapabilityError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
            model,
            Duration::from_secs(120),
        )
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stream: false,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::unavailable(CAPABILITY, "request timed out")
                } else {
                    CapabilityError::unavailable(CAPABILITY, e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(CapabilityError::unavailable(CAPABILITY, "rate limited"));
        }

        if status == 401 || status == 403 {
            return Err(CapabilityError::NotConfigured {
                capability: CAPABILITY.into(),
                reason: "Invalid API key or insufficient permissions".into(),
            });
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(CapabilityError::failed(
                CAPABILITY,
                format!("HTTP {status}: {error_body}"),
            ));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            CapabilityError::invalid_response(CAPABILITY, format!("Failed to parse response: {e}"))
        })?;

        extract_content(api_response)
    }
}

fn extract_content(response: ApiResponse) -> Result<String, CapabilityError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CapabilityError::invalid_response(CAPABILITY, "No choices in response"))?;

    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> OpenAiCompatModel {
        OpenAiCompatModel::new(
            "openai",
            "https://api.openai.com/v1/",
            "sk-test",
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(model().base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn ollama_constructor() {
        let model = OpenAiCompatModel::ollama("llama3", None).unwrap();
        assert_eq!(model.name(), "ollama");
        assert!(model.base_url.contains("localhost:11434"));
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            OpenAiCompatModel::from_config(&config),
            Err(CapabilityError::NotConfigured { .. })
        ));

        let config = LlmConfig {
            api_key: Some("sk-test".into()),
            temperature: 0.2,
            ..LlmConfig::default()
        };
        let model = OpenAiCompatModel::from_config(&config).unwrap();
        assert_eq!(model.model, "gpt-4o-mini");
        assert_eq!(model.temperature, 0.2);
    }

    #[test]
    fn request_body_is_single_user_message() {
        let model = model();
        let body = serde_json::to_value(model.request_body("classify this")).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "classify this");
    }

    #[test]
    fn request_body_borrows_a_rendered_prompt() {
        let model = model();
        let prompt = format!("Summarize the production data for {}", "LINE-1");
        let request = model.request_body(&prompt);
        assert_eq!(request.messages[0].content, prompt.as_str());
        assert_eq!(request.model, "gpt-4o-mini");
    }

    #[test]
    fn content_is_trimmed() {
        let data = r#"{"choices":[{"message":{"role":"assistant","content":"  DOWNTIME_QUERY\n"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "DOWNTIME_QUERY");
    }

    #[test]
    fn missing_content_is_empty() {
        let data = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "");
    }

    #[test]
    fn no_choices_is_invalid_response() {
        let parsed: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_content(parsed),
            Err(CapabilityError::InvalidResponse { .. })
        ));
    }
}
