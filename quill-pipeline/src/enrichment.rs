//! Research enrichment sources
//!
//! Optional context providers (search results, knowledge graph facts) for
//! the research stage. A failing source never aborts a run; the research
//! stage records a warning and continues with weaker context.

use async_trait::async_trait;
use quill_core::domain::request::GenerationRequest;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),
}

/// A source of research context
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    /// Short name used in warnings and logs
    fn name(&self) -> &str;

    /// Returns context snippets for the request
    async fn fetch(&self, request: &GenerationRequest) -> Result<Vec<String>, EnrichmentError>;
}

/// Enrichment service reachable over HTTP
///
/// Receives `{"topic", "keywords"}` and answers with `{"snippets": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpEnrichmentSource {
    name: String,
    url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct EnrichmentQuery<'a> {
    topic: &'a str,
    keywords: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EnrichmentReply {
    #[serde(default)]
    snippets: Vec<String>,
}

impl HttpEnrichmentSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichmentError::Request(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl EnrichmentSource for HttpEnrichmentSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, request: &GenerationRequest) -> Result<Vec<String>, EnrichmentError> {
        let response = self
            .client
            .post(&self.url)
            .json(&EnrichmentQuery {
                topic: &request.topic,
                keywords: &request.keywords,
            })
            .send()
            .await
            .map_err(|e| EnrichmentError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Response(response.status().to_string()));
        }

        let reply = response
            .json::<EnrichmentReply>()
            .await
            .map_err(|e| EnrichmentError::Response(e.to_string()))?;

        Ok(reply
            .snippets
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}
