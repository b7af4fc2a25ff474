//! Working state carried from stage to stage

use quill_core::domain::document::{ContentDocument, InjectedLink, QualityScores};
use quill_core::domain::warning::{StructuralWarning, TitleSource};

use crate::markdown;

/// The document under construction
///
/// Each stage receives the draft produced by the previous stage and returns
/// a new one. Only the orchestrator turns it into a [`ContentDocument`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    /// Outline from the research stage
    pub outline: Option<String>,
    pub title: Option<String>,
    pub title_source: Option<TitleSource>,
    pub meta_description: Option<String>,
    pub body: String,
    pub links: Vec<InjectedLink>,
    pub scores: Option<QualityScores>,
    pub warnings: Vec<StructuralWarning>,
}

impl Draft {
    pub fn word_count(&self) -> usize {
        markdown::count_words(&self.body)
    }

    pub fn h2_count(&self) -> usize {
        markdown::count_headings(&self.body, 2)
    }

    /// Meta description, falling back to the first prose sentence
    pub fn resolved_meta_description(&self) -> String {
        self.meta_description
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(|m| truncate_chars(m, META_DESCRIPTION_MAX_CHARS))
            .unwrap_or_else(|| fallback_meta_description(&self.body))
    }

    /// Assembles the final document
    pub fn into_document(self, title: String) -> ContentDocument {
        let meta_description = self.resolved_meta_description();

        ContentDocument {
            title,
            meta_description,
            headings: markdown::headings(&self.body),
            word_count: markdown::count_words(&self.body),
            body: self.body,
            links: self.links,
            scores: self.scores.unwrap_or_default(),
            warnings: self.warnings,
        }
    }
}

/// Longest meta description kept
pub const META_DESCRIPTION_MAX_CHARS: usize = 160;

/// First sentence of the prose, cut at a word boundary
pub fn fallback_meta_description(body: &str) -> String {
    let prose = markdown::prose_text(body);
    let text = prose.split_whitespace().collect::<Vec<_>>().join(" ");

    let sentence_end = text
        .find(". ")
        .map(|i| i + 1)
        .unwrap_or(text.len());

    truncate_chars(&text[..sentence_end], META_DESCRIPTION_MAX_CHARS)
}

/// Truncates at a word boundary so that the result has at most `max` chars
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.trim().to_string();
    }

    let mut out = String::new();
    for word in text.split_whitespace() {
        let needed = if out.is_empty() { word.chars().count() } else { word.chars().count() + 1 };
        if out.chars().count() + needed > max {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    // A single word longer than `max` is cut mid-word
    if out.is_empty() {
        out = text.trim().chars().take(max).collect();
    }
    out
}
