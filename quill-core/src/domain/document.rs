//! Content document domain types

use serde::{Deserialize, Serialize};

use crate::domain::warning::StructuralWarning;

/// Titles a provider emits when it did not produce a real one
pub const PLACEHOLDER_TITLES: &[&str] = &[
    "untitled",
    "title",
    "[title]",
    "<title>",
    "{title}",
    "tbd",
    "placeholder",
    "placeholder title",
    "your title here",
    "blog post title",
];

/// Returns true when a title is empty or a known placeholder sentinel
pub fn is_placeholder_title(title: &str) -> bool {
    let normalized = title
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '*')
        .trim()
        .to_lowercase();

    normalized.is_empty() || PLACEHOLDER_TITLES.contains(&normalized.as_str())
}

/// A heading of the document body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// An internal link placed into the body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedLink {
    /// Index of the body paragraph holding the link
    pub paragraph: usize,

    /// Byte offset of the link markup in the final body
    pub offset: usize,

    /// Visible anchor text, as it appeared in the body
    pub anchor: String,

    /// Link target path
    pub target: String,

    /// Keyword that produced the link
    pub keyword: String,
}

/// Composite quality scores, each normalized to 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityScores {
    pub readability: f64,
    pub seo: f64,
    pub composite: f64,
}

/// The end product of a successful pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub title: String,
    pub meta_description: String,
    pub body: String,
    pub headings: Vec<Heading>,
    pub links: Vec<InjectedLink>,
    pub scores: QualityScores,
    pub word_count: usize,
    #[serde(default)]
    pub warnings: Vec<StructuralWarning>,
}

impl ContentDocument {
    /// Number of second-level headings
    pub fn h2_count(&self) -> usize {
        self.headings.iter().filter(|h| h.level == 2).count()
    }

    /// Number of links placed in the given paragraph
    pub fn links_in_paragraph(&self, paragraph: usize) -> usize {
        self.links.iter().filter(|l| l.paragraph == paragraph).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_titles_detected() {
        assert!(is_placeholder_title(""));
        assert!(is_placeholder_title("   "));
        assert!(is_placeholder_title("Untitled"));
        assert!(is_placeholder_title("\"[Title]\""));
        assert!(is_placeholder_title("**TBD**"));
    }

    #[test]
    fn test_real_title_is_not_placeholder() {
        assert!(!is_placeholder_title("A Practical Guide to Tokio"));
        assert!(!is_placeholder_title("Title Insurance Explained"));
    }
}
