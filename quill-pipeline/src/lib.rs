//! Content generation pipeline
//!
//! Research, draft, SEO polish, structure repair, internal linking and
//! quality scoring, sequenced by the [`StageOrchestrator`].

pub mod config;
pub mod draft;
pub mod enrichment;
pub mod links;
pub mod markdown;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod retry;
pub mod scoring;
pub mod stages;
pub mod structure;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::PipelineConfig;
pub use orchestrator::{Interrupt, PipelineError, RunControl, StageOrchestrator, Unsupervised};
pub use provider::{GenerationProvider, HttpProvider, ProviderError, ProviderSettings};
