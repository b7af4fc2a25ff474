//! Stage orchestrator
//!
//! Runs the enabled stages strictly in order, handing each stage the draft
//! produced by the previous one, and assembles the final document. A
//! [`RunControl`] lets the caller observe progress and stop the run between
//! stages; provider calls are never interrupted.

use async_trait::async_trait;
use quill_core::domain::document::ContentDocument;
use quill_core::domain::request::GenerationRequest;
use quill_core::domain::stage::{StageKind, StageResult};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::draft::Draft;
use crate::enrichment::EnrichmentSource;
use crate::provider::GenerationProvider;
use crate::stages::{RetryingProvider, Stage, StageContext, default_stages};
use crate::structure::resolve_title;

/// Why a supervised run was stopped between stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// The job was cancelled
    Cancelled,
    /// Another worker owns the job now
    Lost(String),
    /// Progress could not be recorded
    Store(String),
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Cancelled => write!(f, "cancelled"),
            Interrupt::Lost(reason) => write!(f, "claim lost: {}", reason),
            Interrupt::Store(reason) => write!(f, "store error: {}", reason),
        }
    }
}

/// Hooks invoked around every stage of a supervised run
#[async_trait]
pub trait RunControl: Send + Sync {
    /// Called before a stage starts; an error stops the run
    async fn before_stage(&self, stage: StageKind) -> Result<(), Interrupt>;

    /// Called with the result of a completed stage
    async fn after_stage(&self, result: &StageResult) -> Result<(), Interrupt>;
}

/// Control for runs nobody supervises (synchronous generation)
pub struct Unsupervised;

#[async_trait]
impl RunControl for Unsupervised {
    async fn before_stage(&self, _stage: StageKind) -> Result<(), Interrupt> {
        Ok(())
    }

    async fn after_stage(&self, _result: &StageResult) -> Result<(), Interrupt> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("stage {stage} failed after {attempts} provider call(s): {message}")]
    StageFailed {
        stage: StageKind,
        message: String,
        transient: bool,
        attempts: u32,
    },

    /// Too few second-level headings even after repair
    #[error("document has {found} second-level heading(s) after repair, {required} required")]
    StructureIncomplete { found: usize, required: usize },

    #[error("cancelled before stage {before_stage}")]
    Cancelled { before_stage: StageKind },

    #[error("run interrupted at stage {stage}: {interrupt}")]
    Interrupted { stage: StageKind, interrupt: Interrupt },
}

impl PipelineError {
    /// Whether a fresh attempt of the whole run may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::StageFailed { transient: true, .. }
                | PipelineError::StructureIncomplete { .. }
        )
    }

    pub fn stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::InvalidRequest(_) => None,
            PipelineError::StageFailed { stage, .. } => Some(*stage),
            PipelineError::StructureIncomplete { .. } => Some(StageKind::Structure),
            PipelineError::Cancelled { before_stage } => Some(*before_stage),
            PipelineError::Interrupted { stage, .. } => Some(*stage),
        }
    }
}

/// Sequences the pipeline stages
pub struct StageOrchestrator {
    provider: RetryingProvider,
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
    enrichment: Vec<Arc<dyn EnrichmentSource>>,
}

impl StageOrchestrator {
    pub fn new(provider: Arc<dyn GenerationProvider>, config: PipelineConfig) -> Self {
        Self {
            provider: RetryingProvider::new(provider, config.retry_policy()),
            config,
            stages: default_stages(),
            enrichment: Vec::new(),
        }
    }

    /// Adds a research enrichment source
    pub fn with_enrichment(mut self, source: Arc<dyn EnrichmentSource>) -> Self {
        self.enrichment.push(source);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stages that run under the current configuration, in order
    pub fn active_stages(&self) -> Vec<StageKind> {
        self.stages
            .iter()
            .filter(|s| s.enabled(&self.config))
            .map(|s| s.kind())
            .collect()
    }

    /// Runs the pipeline without supervision
    pub async fn run(&self, request: &GenerationRequest) -> Result<ContentDocument, PipelineError> {
        self.run_with(request, &Unsupervised).await
    }

    /// Runs the pipeline, consulting `control` around every stage
    pub async fn run_with(
        &self,
        request: &GenerationRequest,
        control: &dyn RunControl,
    ) -> Result<ContentDocument, PipelineError> {
        request.validate().map_err(PipelineError::InvalidRequest)?;

        let ctx = StageContext {
            request,
            config: &self.config,
            provider: &self.provider,
            enrichment: &self.enrichment,
        };

        let active: Vec<&dyn Stage> = self
            .stages
            .iter()
            .filter(|s| s.enabled(&self.config))
            .map(|s| s.as_ref())
            .collect();
        let total = active.len();
        let mut draft = Draft::default();

        for (index, stage) in active.iter().enumerate() {
            let kind = stage.kind();

            control.before_stage(kind).await.map_err(|interrupt| match interrupt {
                Interrupt::Cancelled => PipelineError::Cancelled { before_stage: kind },
                other => PipelineError::Interrupted {
                    stage: kind,
                    interrupt: other,
                },
            })?;

            info!("stage {}/{}: {}", index + 1, total, kind);

            let output = stage.run(&ctx, draft).await.map_err(|e| {
                error!("Stage {} failed after {} call(s): {}", kind, e.calls, e.error);
                PipelineError::StageFailed {
                    stage: kind,
                    message: e.error.message().to_string(),
                    transient: e.error.is_transient(),
                    attempts: e.calls,
                }
            })?;

            debug!(
                "Stage {} finished ({} provider calls, {} warnings)",
                kind,
                output.result.provider_calls,
                output.result.warnings.len()
            );

            draft = output.draft;

            control.after_stage(&output.result).await.map_err(|interrupt| {
                let next = active.get(index + 1).map(|s| s.kind()).unwrap_or(kind);
                match interrupt {
                    Interrupt::Cancelled => PipelineError::Cancelled { before_stage: next },
                    other => PipelineError::Interrupted {
                        stage: kind,
                        interrupt: other,
                    },
                }
            })?;

            // Heading shortfall left after repair; a new attempt redrafts
            if kind == StageKind::Structure && draft.h2_count() < self.config.min_h2_headings {
                return Err(PipelineError::StructureIncomplete {
                    found: draft.h2_count(),
                    required: self.config.min_h2_headings,
                });
            }
        }

        let title = match draft.title.clone() {
            Some(title) => title,
            None => resolve_title(None, &draft.body, &request.topic).0,
        };

        Ok(draft.into_document(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::testing::{SAMPLE_TITLE, ScriptedProvider};
    use std::sync::Mutex;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "Async Rust in Practice",
            vec!["tokio".to_string(), "futures".to_string()],
            300,
        )
    }

    fn orchestrator(provider: Arc<ScriptedProvider>, config: PipelineConfig) -> StageOrchestrator {
        StageOrchestrator::new(provider, config)
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            retry_backoff_ms: 0,
            max_retry_backoff_ms: 0,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_full_run_produces_valid_document() {
        let provider = Arc::new(ScriptedProvider::new());
        let doc = orchestrator(provider.clone(), fast_config())
            .run(&request())
            .await
            .unwrap();

        assert!(doc.h2_count() >= 3);
        assert!(!doc.title.is_empty());
        assert!((225..=375).contains(&doc.word_count), "word count {}", doc.word_count);
        assert!(doc.links.len() <= 2);
        assert!(!doc.links.is_empty());
        assert!(doc.scores.composite > 0.0);
        assert_eq!(provider.calls(StageKind::Research), 1);
        assert_eq!(provider.calls(StageKind::Draft), 1);
        assert_eq!(provider.calls(StageKind::SeoPolish), 1);
    }

    #[tokio::test]
    async fn test_placeholder_title_falls_back_to_heading() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(StageKind::SeoPolish, Ok("TITLE: Untitled\nMETA: short".to_string()));

        let doc = orchestrator(provider, fast_config())
            .run(&request())
            .await
            .unwrap();

        assert_eq!(doc.title, SAMPLE_TITLE);
        assert!(doc.warnings.iter().any(|w| matches!(
            w,
            quill_core::domain::warning::StructuralWarning::TitleFallback { .. }
        )));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_in_process() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.fail_times(StageKind::Draft, 2, true);

        let doc = orchestrator(provider.clone(), fast_config())
            .run(&request())
            .await
            .unwrap();

        assert!(doc.h2_count() >= 3);
        assert_eq!(provider.calls(StageKind::Draft), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_stage() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.fail_times(StageKind::SeoPolish, 10, true);

        let err = orchestrator(provider.clone(), fast_config())
            .run(&request())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(StageKind::SeoPolish));
        assert!(err.is_transient());
        assert!(matches!(err, PipelineError::StageFailed { attempts: 3, .. }));
        assert_eq!(provider.calls(StageKind::SeoPolish), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_aborts_immediately() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(
            StageKind::Research,
            Err(ProviderError::Permanent("invalid api key".into())),
        );

        let err = orchestrator(provider.clone(), fast_config())
            .run(&request())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(StageKind::Research));
        assert!(!err.is_transient());
        assert_eq!(provider.calls(StageKind::Research), 1);
        assert_eq!(provider.calls(StageKind::Draft), 0);
    }

    #[tokio::test]
    async fn test_disabled_stages_are_skipped() {
        let provider = Arc::new(ScriptedProvider::new());
        let config = PipelineConfig {
            enable_research: false,
            enable_seo_polish: false,
            enable_internal_links: false,
            ..fast_config()
        };

        let orchestrator = orchestrator(provider.clone(), config);
        assert_eq!(
            orchestrator.active_stages(),
            vec![StageKind::Draft, StageKind::Structure, StageKind::Scoring]
        );

        let doc = orchestrator.run(&request()).await.unwrap();
        assert!(doc.links.is_empty());
        assert_eq!(doc.title, SAMPLE_TITLE);
        assert_eq!(provider.calls(StageKind::Research), 0);
        assert_eq!(provider.calls(StageKind::SeoPolish), 0);
    }

    #[tokio::test]
    async fn test_unrepairable_structure_fails_run() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(
            StageKind::Draft,
            Ok(format!("# Title\n\n### Only one\n\n{}\n", "Some words here. ".repeat(60))),
        );

        let err = orchestrator(provider, fast_config())
            .run(&request())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(StageKind::Structure));
        assert!(err.is_transient());
        assert_eq!(
            err,
            PipelineError::StructureIncomplete {
                found: 1,
                required: 3
            }
        );
        assert_eq!(
            err.to_string(),
            "document has 1 second-level heading(s) after repair, 3 required"
        );
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let provider = Arc::new(ScriptedProvider::new());
        let mut req = request();
        req.target_word_count = 5;

        let err = orchestrator(provider.clone(), fast_config())
            .run(&req)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidRequest(_)));
        assert_eq!(provider.total_calls(), 0);
    }

    struct UnreachableSource;

    #[async_trait]
    impl EnrichmentSource for UnreachableSource {
        fn name(&self) -> &str {
            "search"
        }

        async fn fetch(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Vec<String>, crate::enrichment::EnrichmentError> {
            Err(crate::enrichment::EnrichmentError::Request(
                "connection refused".to_string(),
            ))
        }
    }

    #[tokio::test]
    async fn test_failing_enrichment_degrades_research() {
        let provider = Arc::new(ScriptedProvider::new());
        let orchestrator = orchestrator(provider.clone(), fast_config())
            .with_enrichment(Arc::new(UnreachableSource));

        let doc = orchestrator.run(&request()).await.unwrap();

        assert!(doc.h2_count() >= 3);
        assert!(!doc.title.is_empty());
        assert!(doc.warnings.iter().any(|w| matches!(
            w,
            quill_core::domain::warning::StructuralWarning::EnrichmentUnavailable { source, reason }
                if source == "search" && reason.contains("connection refused")
        )));
        assert_eq!(provider.calls(StageKind::Research), 1);
    }

    struct CancelBefore {
        stage: StageKind,
        seen: Mutex<Vec<StageKind>>,
    }

    #[async_trait]
    impl RunControl for CancelBefore {
        async fn before_stage(&self, stage: StageKind) -> Result<(), Interrupt> {
            if stage == self.stage {
                return Err(Interrupt::Cancelled);
            }
            Ok(())
        }

        async fn after_stage(&self, result: &StageResult) -> Result<(), Interrupt> {
            self.seen.lock().unwrap().push(result.stage);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancellation_between_stages() {
        let provider = Arc::new(ScriptedProvider::new());
        let control = CancelBefore {
            stage: StageKind::SeoPolish,
            seen: Mutex::new(Vec::new()),
        };

        let err = orchestrator(provider.clone(), fast_config())
            .run_with(&request(), &control)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::Cancelled {
                before_stage: StageKind::SeoPolish
            }
        );
        assert_eq!(
            *control.seen.lock().unwrap(),
            vec![StageKind::Research, StageKind::Draft]
        );
        assert_eq!(provider.calls(StageKind::SeoPolish), 0);
    }
}
