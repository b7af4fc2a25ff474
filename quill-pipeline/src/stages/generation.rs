//! Provider-backed stages: research, draft and SEO polish

use async_trait::async_trait;
use quill_core::domain::stage::{StageKind, StageResult};
use quill_core::domain::warning::{StructuralWarning, TitleSource};
use tracing::{debug, warn};

use super::{Stage, StageContext, StageError, StageOutput};
use crate::config::PipelineConfig;
use crate::draft::Draft;
use crate::markdown;
use crate::prompts;
use crate::structure::resolve_title;

/// Research/outline stage
pub struct ResearchStage;

#[async_trait]
impl Stage for ResearchStage {
    fn kind(&self) -> StageKind {
        StageKind::Research
    }

    fn enabled(&self, config: &PipelineConfig) -> bool {
        config.enable_research
    }

    async fn run(&self, ctx: &StageContext<'_>, mut draft: Draft) -> Result<StageOutput, StageError> {
        let mut context = Vec::new();
        let mut warnings = Vec::new();

        for source in ctx.enrichment {
            match source.fetch(ctx.request).await {
                Ok(snippets) => {
                    debug!("Enrichment source {} returned {} snippets", source.name(), snippets.len());
                    context.extend(snippets);
                }
                Err(e) => {
                    warn!("Enrichment source {} unavailable: {}", source.name(), e);
                    warnings.push(StructuralWarning::EnrichmentUnavailable {
                        source: source.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let prompt = prompts::research(ctx.request, &context);
        let outline = ctx
            .provider
            .generate(self.kind(), &prompt, ctx.config.research_max_tokens)
            .await?;

        let text = outline.value.trim().to_string();
        let mut result = StageResult::new(self.kind(), text.clone())
            .with_metric("outline_words", markdown::count_words(&text) as f64)
            .with_metric("context_snippets", context.len() as f64);
        result.provider_calls = outline.calls;
        result.warnings = warnings.clone();

        draft.outline = Some(text);
        draft.warnings.extend(warnings);

        Ok(StageOutput { draft, result })
    }
}

/// Drafting stage
pub struct DraftStage;

#[async_trait]
impl Stage for DraftStage {
    fn kind(&self) -> StageKind {
        StageKind::Draft
    }

    async fn run(&self, ctx: &StageContext<'_>, mut draft: Draft) -> Result<StageOutput, StageError> {
        let prompt = prompts::draft(ctx.request, draft.outline.as_deref(), ctx.config);
        let max_tokens = ctx.config.draft_tokens(ctx.request.target_word_count);
        let generated = ctx.provider.generate(self.kind(), &prompt, max_tokens).await?;

        draft.body = strip_outer_fence(&generated.value);

        let mut result = StageResult::new(self.kind(), draft.body.clone())
            .with_metric("word_count", draft.word_count() as f64)
            .with_metric("h2_count", draft.h2_count() as f64)
            .with_metric("h3_count", markdown::count_headings(&draft.body, 3) as f64);
        result.provider_calls = generated.calls;

        Ok(StageOutput { draft, result })
    }
}

/// SEO polish stage: title and meta description
///
/// An invalid title falls back to the first top-level heading of the
/// draft, then to the topic.
pub struct SeoStage;

#[async_trait]
impl Stage for SeoStage {
    fn kind(&self) -> StageKind {
        StageKind::SeoPolish
    }

    fn enabled(&self, config: &PipelineConfig) -> bool {
        config.enable_seo_polish
    }

    async fn run(&self, ctx: &StageContext<'_>, mut draft: Draft) -> Result<StageOutput, StageError> {
        let prompt = prompts::seo(ctx.request, &draft.body);
        let generated = ctx
            .provider
            .generate(self.kind(), &prompt, ctx.config.seo_max_tokens)
            .await?;

        let metadata = parse_seo_metadata(&generated.value);
        let (title, source) = resolve_title(metadata.title.as_deref(), &draft.body, &ctx.request.topic);

        let mut warnings = Vec::new();
        if source != TitleSource::SeoStage {
            warn!("SEO stage produced no usable title; using {}", source);
            warnings.push(StructuralWarning::TitleFallback { source });
        }

        draft.title = Some(title.clone());
        draft.title_source = Some(source);
        draft.meta_description = metadata.meta_description;
        draft.warnings.extend(warnings.iter().cloned());

        let meta = draft.resolved_meta_description();
        let mut result = StageResult::new(self.kind(), format!("TITLE: {}\nMETA: {}", title, meta))
            .with_metric("title_chars", title.chars().count() as f64)
            .with_metric("meta_chars", meta.chars().count() as f64);
        result.provider_calls = generated.calls;
        result.warnings = warnings;

        Ok(StageOutput { draft, result })
    }
}

/// Title and meta description parsed from an SEO completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeoMetadata {
    pub title: Option<String>,
    pub meta_description: Option<String>,
}

/// Parses `TITLE:` and `META:` lines, case-insensitively
pub fn parse_seo_metadata(text: &str) -> SeoMetadata {
    let mut metadata = SeoMetadata::default();

    for line in text.lines() {
        let line = line.trim().trim_start_matches(['*', '-', ' ']);
        if let Some(value) = strip_label(line, "title") {
            metadata.title.get_or_insert_with(|| value.to_string());
        } else if let Some(value) = strip_label(line, "meta description")
            .or_else(|| strip_label(line, "meta"))
        {
            metadata.meta_description.get_or_insert_with(|| value.to_string());
        }
    }

    metadata
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }

    let rest = line[label.len()..].trim_start_matches('*').trim_start();
    let value = rest.strip_prefix(':')?.trim().trim_matches('*').trim();
    (!value.is_empty()).then_some(value)
}

/// Removes a fence wrapping the whole completion (```markdown ... ```)
fn strip_outer_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(first_newline) = trimmed.find('\n') else {
        return trimmed.to_string();
    };

    let first_line = &trimmed[..first_newline];
    if markdown::is_fence(first_line) && trimmed.ends_with("```") && trimmed.len() > first_newline + 3 {
        let inner = &trimmed[first_newline + 1..trimmed.len() - 3];
        if !inner.contains("```") {
            return format!("{}\n", inner.trim());
        }
    }

    format!("{}\n", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seo_metadata() {
        let text = "TITLE: Async Rust with Tokio\nMETA: Learn how Tokio runs async tasks.\n";
        let parsed = parse_seo_metadata(text);
        assert_eq!(parsed.title.as_deref(), Some("Async Rust with Tokio"));
        assert_eq!(parsed.meta_description.as_deref(), Some("Learn how Tokio runs async tasks."));
    }

    #[test]
    fn test_parse_seo_metadata_tolerates_formatting() {
        let text = "Here you go:\n**Title:** Fast Services\n- Meta Description: Build them.\n";
        let parsed = parse_seo_metadata(text);
        assert_eq!(parsed.title.as_deref(), Some("Fast Services"));
        assert_eq!(parsed.meta_description.as_deref(), Some("Build them."));
    }

    #[test]
    fn test_parse_seo_metadata_missing_lines() {
        let parsed = parse_seo_metadata("no structured output");
        assert_eq!(parsed, SeoMetadata::default());

        let parsed = parse_seo_metadata("TITLE:\nMETA: only meta");
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_strip_outer_fence() {
        assert_eq!(strip_outer_fence("```markdown\n# T\n\nBody\n```"), "# T\n\nBody\n");
        assert_eq!(strip_outer_fence("# T\n\n```\ncode\n```"), "# T\n\n```\ncode\n```\n");
        assert_eq!(strip_outer_fence("  plain  "), "plain");
    }
}
