//! Structural warning domain types
//!
//! Warnings are non-blocking findings attached to stage results and to the
//! final document. They never fail a run.

use serde::{Deserialize, Serialize};

/// A non-fatal finding produced while generating a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    /// Fewer second-level headings than required, even after promotion
    TooFewHeadings { found: usize, required: usize },

    /// Word count outside the tolerance band around the target
    WordCountOutOfBand {
        actual: usize,
        target: u32,
        min: usize,
        max: usize,
    },

    /// FAQ section was requested but not found
    MissingFaq,

    /// Fewer links placed than keywords offered within the budget
    LinkBudgetUnfilled { placed: usize, requested: usize },

    /// Title came from a fallback instead of the SEO stage
    TitleFallback { source: TitleSource },

    /// An optional research source failed and was skipped
    EnrichmentUnavailable { source: String, reason: String },
}

/// Where the document title came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    SeoStage,
    DraftHeading,
    Topic,
}

impl std::fmt::Display for TitleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TitleSource::SeoStage => write!(f, "seo stage"),
            TitleSource::DraftHeading => write!(f, "draft heading"),
            TitleSource::Topic => write!(f, "topic"),
        }
    }
}

impl std::fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuralWarning::TooFewHeadings { found, required } => write!(
                f,
                "only {} second-level heading(s), {} required",
                found, required
            ),
            StructuralWarning::WordCountOutOfBand {
                actual,
                target,
                min,
                max,
            } => write!(
                f,
                "word count {} outside {}..={} (target {})",
                actual, min, max, target
            ),
            StructuralWarning::MissingFaq => write!(f, "FAQ section requested but missing"),
            StructuralWarning::LinkBudgetUnfilled { placed, requested } => {
                write!(f, "placed {} of {} internal link(s)", placed, requested)
            }
            StructuralWarning::TitleFallback { source } => {
                write!(f, "title taken from {}", source)
            }
            StructuralWarning::EnrichmentUnavailable { source, reason } => {
                write!(f, "research source '{}' unavailable: {}", source, reason)
            }
        }
    }
}
