//! Content structure validator and repairer
//!
//! Enforces the structural invariants of a draft without calling the
//! provider:
//! - at least `min_h2_headings` second-level headings, promoting third-level
//!   headings in document order when short
//! - word count within the tolerance band of the target (warning only)
//! - a real title, via the fallback chain SEO title -> first H1 -> topic
//!
//! The pass is pure and deterministic.

use quill_core::domain::document::is_placeholder_title;
use quill_core::domain::request::GenerationRequest;
use quill_core::domain::warning::{StructuralWarning, TitleSource};

use crate::config::PipelineConfig;
use crate::draft::Draft;
use crate::markdown;

/// Findings of one validate-and-repair pass
#[derive(Debug, Clone, PartialEq)]
pub struct StructureReport {
    pub h2_before: usize,
    pub h2_after: usize,
    pub promoted: usize,
    pub word_count: usize,
    pub title_source: TitleSource,
    pub warnings: Vec<StructuralWarning>,
}

/// Validates a draft and repairs what can be repaired in place
///
/// Warnings are appended to the draft as well as returned in the report.
pub fn validate_and_repair(
    mut draft: Draft,
    request: &GenerationRequest,
    config: &PipelineConfig,
) -> (Draft, StructureReport) {
    let mut warnings = Vec::new();

    // (a) heading minimum
    let h2_before = draft.h2_count();
    let (body, promoted) = promote_headings(&draft.body, config.min_h2_headings);
    draft.body = body;
    let h2_after = h2_before + promoted;

    if h2_after < config.min_h2_headings {
        warnings.push(StructuralWarning::TooFewHeadings {
            found: h2_after,
            required: config.min_h2_headings,
        });
    }

    // (b) word count band
    let word_count = draft.word_count();
    let (min, max) = config.word_band(request.target_word_count);
    if word_count < min || word_count > max {
        warnings.push(StructuralWarning::WordCountOutOfBand {
            actual: word_count,
            target: request.target_word_count,
            min,
            max,
        });
    }

    if request.flags.include_faq && !has_faq_section(&draft.body) {
        warnings.push(StructuralWarning::MissingFaq);
    }

    // (c) title
    let (title, title_source) = resolve_title(draft.title.as_deref(), &draft.body, &request.topic);
    if title_source != TitleSource::SeoStage && draft.title_source != Some(title_source) {
        warnings.push(StructuralWarning::TitleFallback {
            source: title_source,
        });
    }
    draft.title = Some(title);
    draft.title_source = Some(title_source);

    draft.warnings.extend(warnings.iter().cloned());

    let report = StructureReport {
        h2_before,
        h2_after,
        promoted,
        word_count,
        title_source,
        warnings,
    };

    (draft, report)
}

/// Promotes third-level headings to second level, in document order,
/// until `min_h2` is reached or none remain
///
/// Returns the rewritten body and the number of promoted headings.
pub fn promote_headings(body: &str, min_h2: usize) -> (String, usize) {
    let existing = markdown::count_headings(body, 2);
    let mut needed = min_h2.saturating_sub(existing);
    if needed == 0 {
        return (body.to_string(), 0);
    }

    let mut out = String::with_capacity(body.len());
    let mut in_fence = false;
    let mut promoted = 0;

    for raw in body.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);

        if markdown::is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence && needed > 0 {
            if let Some((3, text)) = markdown::heading_level(line) {
                if !text.is_empty() {
                    let hashes = line.find("###").unwrap_or(0);
                    out.push_str(&raw[..hashes]);
                    out.push_str("##");
                    out.push_str(&raw[hashes + 3..]);
                    needed -= 1;
                    promoted += 1;
                    continue;
                }
            }
        }

        out.push_str(raw);
    }

    (out, promoted)
}

/// Title fallback chain: candidate -> first top-level heading -> topic
pub fn resolve_title(candidate: Option<&str>, body: &str, topic: &str) -> (String, TitleSource) {
    if let Some(title) = candidate.map(clean_title) {
        if !is_placeholder_title(&title) {
            return (title, TitleSource::SeoStage);
        }
    }

    if let Some(heading) = markdown::first_h1(body).map(|h| clean_title(&h)) {
        if !is_placeholder_title(&heading) {
            return (heading, TitleSource::DraftHeading);
        }
    }

    (topic.trim().to_string(), TitleSource::Topic)
}

/// Strips surrounding whitespace, quotes and emphasis markers
pub fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '*' || c == '#')
        .trim()
        .to_string()
}

fn has_faq_section(body: &str) -> bool {
    markdown::headings(body).iter().any(|h| {
        let text = h.text.to_lowercase();
        text.contains("faq") || text.contains("frequently asked")
    })
}
