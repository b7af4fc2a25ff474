//! Generation provider client
//!
//! The provider is the external text-generation service. The pipeline only
//! needs `generate(prompt, max_tokens)` and a transient/permanent error
//! classification to decide whether a call is worth retrying.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors returned by a generation provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Network failures, timeouts, rate limiting, 5xx responses
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Requests the provider will never accept as sent
    #[error("permanent provider error: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ProviderError::Transient(msg) | ProviderError::Permanent(msg) => msg,
        }
    }
}

/// A text-generation service
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generates text for a prompt
    ///
    /// # Arguments
    /// * `prompt` - The full prompt
    /// * `max_tokens` - Upper bound on generated tokens
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError>;
}

/// Connection settings for [`HttpProvider`]
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of an OpenAI-compatible API (e.g., "https://api.example.com/v1")
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

/// Provider speaking the OpenAI-compatible chat completions protocol
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpProvider {
    /// Creates a new HTTP provider
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Permanent(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            model: settings.model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl GenerationProvider for HttpProvider {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("Calling provider model {} (max_tokens={})", self.model, max_tokens);

        let response = request.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::Transient(format!("malformed provider response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ProviderError::Transient(
                "provider returned an empty completion".to_string(),
            ));
        }

        Ok(content)
    }
}

/// Classifies a non-success HTTP status
pub fn classify_status(status: StatusCode, body: String) -> ProviderError {
    let message = format!("{} - {}", status, body);

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        ProviderError::Transient(message)
    } else {
        ProviderError::Permanent(message)
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_builder() {
        ProviderError::Permanent(format!("invalid provider request: {}", err))
    } else {
        ProviderError::Transient(format!("provider request failed: {}", err))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_retryable_statuses() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_transient());
        assert!(classify_status(StatusCode::BAD_GATEWAY, String::new()).is_transient());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, String::new()).is_transient());
    }

    #[test]
    fn test_classify_permanent_statuses() {
        let err = classify_status(StatusCode::BAD_REQUEST, "prompt too long".to_string());
        assert!(!err.is_transient());
        assert!(err.message().contains("prompt too long"));

        assert!(!classify_status(StatusCode::UNAUTHORIZED, String::new()).is_transient());
    }

    #[test]
    fn test_provider_trims_base_url() {
        let provider = HttpProvider::new(ProviderSettings {
            base_url: "http://localhost:9000/v1/".to_string(),
            api_key: None,
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(provider.base_url, "http://localhost:9000/v1");
        assert_eq!(provider.model(), "test-model");
    }
}
