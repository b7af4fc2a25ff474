//! Pipeline stages
//!
//! Each stage implements [`Stage`]: it receives the draft produced by the
//! previous stage together with the original request and returns the next
//! draft plus a [`StageResult`] describing what it did.

mod finishing;
mod generation;

pub use finishing::{LinkStage, ScoringStage, StructureStage};
pub use generation::{DraftStage, ResearchStage, SeoStage};

use async_trait::async_trait;
use quill_core::domain::request::GenerationRequest;
use quill_core::domain::stage::{StageKind, StageResult};
use std::sync::Arc;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::draft::Draft;
use crate::enrichment::EnrichmentSource;
use crate::provider::{GenerationProvider, ProviderError};
use crate::retry::{Exhausted, Retried, RetryPolicy};

/// Everything a stage may read while it runs
pub struct StageContext<'a> {
    pub request: &'a GenerationRequest,
    pub config: &'a PipelineConfig,
    pub provider: &'a RetryingProvider,
    pub enrichment: &'a [Arc<dyn EnrichmentSource>],
}

/// Draft and result produced by a stage
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub draft: Draft,
    pub result: StageResult,
}

/// Stage failure after in-process retries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct StageError {
    pub error: ProviderError,

    /// Provider calls made before giving up
    pub calls: u32,
}

impl From<Exhausted> for StageError {
    fn from(exhausted: Exhausted) -> Self {
        Self {
            error: exhausted.error,
            calls: exhausted.calls,
        }
    }
}

/// One step of the generation pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Whether the stage runs under this configuration
    fn enabled(&self, _config: &PipelineConfig) -> bool {
        true
    }

    async fn run(&self, ctx: &StageContext<'_>, draft: Draft) -> Result<StageOutput, StageError>;
}

/// The fixed stage sequence
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ResearchStage),
        Box::new(DraftStage),
        Box::new(SeoStage),
        Box::new(StructureStage),
        Box::new(LinkStage),
        Box::new(ScoringStage),
    ]
}

/// Provider wrapper applying the shared retry policy
///
/// Blank completions count as transient failures.
#[derive(Clone)]
pub struct RetryingProvider {
    provider: Arc<dyn GenerationProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(provider: Arc<dyn GenerationProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn generate(
        &self,
        stage: StageKind,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Retried<String>, Exhausted> {
        self.policy
            .run(stage.as_str(), || async {
                let text = self.provider.generate(prompt, max_tokens).await?;
                if text.trim().is_empty() {
                    return Err(ProviderError::Transient(format!(
                        "{} stage received an empty completion",
                        stage
                    )));
                }
                Ok(text)
            })
            .await
    }
}
