//! Deterministic stages: structure repair, link injection and scoring

use async_trait::async_trait;
use quill_core::domain::stage::{StageKind, StageResult};

use super::{Stage, StageContext, StageError, StageOutput};
use crate::config::PipelineConfig;
use crate::draft::Draft;
use crate::links;
use crate::scoring;
use crate::structure;

pub struct StructureStage;

#[async_trait]
impl Stage for StructureStage {
    fn kind(&self) -> StageKind {
        StageKind::Structure
    }

    async fn run(&self, ctx: &StageContext<'_>, draft: Draft) -> Result<StageOutput, StageError> {
        let (draft, report) = structure::validate_and_repair(draft, ctx.request, ctx.config);

        let mut result = StageResult::new(self.kind(), draft.body.clone())
            .with_metric("h2_before", report.h2_before as f64)
            .with_metric("h2_count", report.h2_after as f64)
            .with_metric("promoted_headings", report.promoted as f64)
            .with_metric("word_count", report.word_count as f64);
        result.warnings = report.warnings;

        Ok(StageOutput { draft, result })
    }
}

pub struct LinkStage;

#[async_trait]
impl Stage for LinkStage {
    fn kind(&self) -> StageKind {
        StageKind::InternalLinks
    }

    fn enabled(&self, config: &PipelineConfig) -> bool {
        config.enable_internal_links
    }

    async fn run(&self, ctx: &StageContext<'_>, mut draft: Draft) -> Result<StageOutput, StageError> {
        let keywords = ctx.request.ranked_keywords();
        let linked = links::inject(&draft.body, &keywords, ctx.config);

        let mut result = StageResult::new(self.kind(), linked.body.clone())
            .with_metric("links", linked.links.len() as f64)
            .with_metric("keywords", keywords.len() as f64);
        result.warnings = linked.warnings.clone();

        draft.body = linked.body;
        draft.links = linked.links;
        draft.warnings.extend(linked.warnings);

        Ok(StageOutput { draft, result })
    }
}

pub struct ScoringStage;

#[async_trait]
impl Stage for ScoringStage {
    fn kind(&self) -> StageKind {
        StageKind::Scoring
    }

    async fn run(&self, ctx: &StageContext<'_>, mut draft: Draft) -> Result<StageOutput, StageError> {
        let scores = scoring::score(&draft, ctx.request, ctx.config);
        draft.scores = Some(scores);

        let result = StageResult::new(
            self.kind(),
            format!(
                "readability={:.1} seo={:.1} composite={:.1}",
                scores.readability, scores.seo, scores.composite
            ),
        )
        .with_metric("readability", scores.readability)
        .with_metric("seo", scores.seo)
        .with_metric("composite", scores.composite);

        Ok(StageOutput { draft, result })
    }
}
