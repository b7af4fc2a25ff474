//! Internal link injection
//!
//! Places a bounded number of contextual links into prose paragraphs. Each
//! keyword, in ranked order, is linked at most once: at its first un-linked
//! whole-word occurrence in the earliest paragraph that still has room.
//! Headings, fenced code, inline code and existing links are never touched.

use quill_core::domain::document::InjectedLink;
use quill_core::domain::warning::StructuralWarning;
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use crate::config::PipelineConfig;
use crate::markdown::{self, BlockKind};

/// Result of a link injection pass
#[derive(Debug, Clone, PartialEq)]
pub struct Linked {
    pub body: String,
    pub links: Vec<InjectedLink>,
    pub warnings: Vec<StructuralWarning>,
}

/// Builds the URL slug for a keyword
pub fn slugify(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Link target for a keyword under the configured base path
pub fn link_target(base_path: &str, keyword: &str) -> String {
    format!("{}/{}", base_path.trim_end_matches('/'), slugify(keyword))
}

struct Placement {
    range: Range<usize>,
    paragraph: usize,
    keyword: String,
}

/// Injects links for `keywords` into `body`
///
/// # Arguments
/// * `body` - Markdown body
/// * `keywords` - Keywords, most relevant first
/// * `config` - Link budget and base path
pub fn inject(body: &str, keywords: &[&str], config: &PipelineConfig) -> Linked {
    let keywords = dedup_keywords(keywords);
    let mut pending: Vec<&str> = keywords.clone();
    let mut placements: Vec<Placement> = Vec::new();

    let paragraphs = markdown::blocks(body)
        .into_iter()
        .filter(|b| b.kind == BlockKind::Prose)
        .enumerate();

    for (paragraph, block) in paragraphs {
        if placements.len() >= config.max_links_total || pending.is_empty() {
            break;
        }

        let text = &body[block.range.clone()];
        let mut protected = protected_ranges(text);
        let mut in_paragraph = 0;

        pending.retain(|keyword| {
            if in_paragraph >= config.max_links_per_paragraph
                || placements.len() >= config.max_links_total
            {
                return true;
            }

            match find_unprotected(text, keyword, &protected) {
                Some(range) => {
                    protected.push(range.clone());
                    placements.push(Placement {
                        range: block.range.start + range.start..block.range.start + range.end,
                        paragraph,
                        keyword: keyword.to_string(),
                    });
                    in_paragraph += 1;
                    false
                }
                None => true,
            }
        });
    }

    placements.sort_by_key(|p| p.range.start);

    let mut out = String::with_capacity(body.len() + placements.len() * 32);
    let mut links = Vec::with_capacity(placements.len());
    let mut last = 0;

    for placement in placements {
        out.push_str(&body[last..placement.range.start]);

        let anchor = &body[placement.range.clone()];
        let target = link_target(&config.link_base_path, &placement.keyword);
        let offset = out.len();
        out.push('[');
        out.push_str(anchor);
        out.push_str("](");
        out.push_str(&target);
        out.push(')');

        links.push(InjectedLink {
            paragraph: placement.paragraph,
            offset,
            anchor: anchor.to_string(),
            target,
            keyword: placement.keyword,
        });
        last = placement.range.end;
    }
    out.push_str(&body[last..]);

    let mut warnings = Vec::new();
    let requested = keywords.len().min(config.max_links_total);
    if links.len() < requested {
        warnings.push(StructuralWarning::LinkBudgetUnfilled {
            placed: links.len(),
            requested,
        });
    }

    Linked {
        body: out,
        links,
        warnings,
    }
}

/// Drops empty and case-insensitive duplicate keywords, keeping rank order
fn dedup_keywords<'a>(keywords: &[&'a str]) -> Vec<&'a str> {
    let mut seen: Vec<String> = Vec::new();
    let mut result = Vec::new();

    for keyword in keywords.iter().map(|k| k.trim()) {
        if keyword.is_empty() {
            continue;
        }
        let normalized = slugify(keyword);
        if seen.contains(&normalized) {
            continue;
        }
        seen.push(normalized);
        result.push(keyword);
    }

    result
}

fn find_unprotected(text: &str, keyword: &str, protected: &[Range<usize>]) -> Option<Range<usize>> {
    let mut pos = 0;
    while let Some(range) = markdown::find_term(text, keyword, pos) {
        let overlaps = protected
            .iter()
            .any(|p| range.start < p.end && p.start < range.end);
        if !overlaps {
            return Some(range);
        }
        pos = range.start + text[range.start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Byte ranges of a paragraph that must not receive a link
fn protected_ranges(text: &str) -> Vec<Range<usize>> {
    static INLINE: OnceLock<Regex> = OnceLock::new();
    let re = INLINE.get_or_init(|| {
        Regex::new(r"!?\[[^\]]*\]\([^)]*\)|`[^`\n]*`|<[a-z]+://[^>]*>|https?://\S+")
            .expect("valid regex")
    });

    let mut ranges: Vec<Range<usize>> = re.find_iter(text).map(|m| m.range()).collect();

    for (start, line) in markdown::lines_with_offsets(text) {
        if markdown::heading_level(line).is_some() {
            ranges.push(start..start + line.len());
        }
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Async Rust"), "async-rust");
        assert_eq!(slugify("  tokio   runtime "), "tokio-runtime");
        assert_eq!(link_target("/", "Async Rust"), "/async-rust");
        assert_eq!(link_target("/blog/", "tokio"), "/blog/tokio");
    }

    #[test]
    fn test_links_first_occurrence() {
        let body = "## Intro\n\nTokio powers async Rust. Tokio is fast.\n";
        let linked = inject(body, &["tokio"], &config());

        assert_eq!(
            linked.body,
            "## Intro\n\n[Tokio](/tokio) powers async Rust. Tokio is fast.\n"
        );
        assert_eq!(linked.links.len(), 1);
        let link = &linked.links[0];
        assert_eq!(link.paragraph, 0);
        assert_eq!(link.anchor, "Tokio");
        assert!(linked.body[link.offset..].starts_with("[Tokio](/tokio)"));
        assert!(linked.warnings.is_empty());
    }

    #[test]
    fn test_per_paragraph_and_total_budgets() {
        let body = "a b c d e f g\n\nf g a b\n\nc d e\n";
        let keywords = ["a", "b", "c", "d", "e", "f", "g"];
        let linked = inject(body, &keywords, &config());

        assert_eq!(linked.links.len(), 5);
        for paragraph in 0..3 {
            let count = linked.links.iter().filter(|l| l.paragraph == paragraph).count();
            assert!(count <= 2, "paragraph {} has {} links", paragraph, count);
        }

        let mut linked_keywords: Vec<_> = linked.links.iter().map(|l| l.keyword.clone()).collect();
        linked_keywords.sort();
        linked_keywords.dedup();
        assert_eq!(linked_keywords.len(), 5);
    }

    #[test]
    fn test_keywords_in_rank_order() {
        let body = "rust and tokio and serde\n";
        let linked = inject(body, &["serde", "tokio", "rust"], &config());
        let keywords: Vec<_> = linked.links.iter().map(|l| l.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["tokio", "serde"]);
        assert_eq!(
            linked.warnings,
            vec![StructuralWarning::LinkBudgetUnfilled {
                placed: 2,
                requested: 3
            }]
        );
    }

    #[test]
    fn test_skips_headings_code_and_existing_links() {
        let body = "## Tokio\n\n```\ntokio here\n```\n\nSee [tokio](/x) and `tokio` here.\n\nTokio again.\n";
        let linked = inject(body, &["tokio"], &config());

        assert_eq!(linked.links.len(), 1);
        assert_eq!(linked.links[0].paragraph, 1);
        assert!(linked.body.ends_with("[Tokio](/tokio) again.\n"));
        assert!(linked.body.starts_with("## Tokio\n\n```\ntokio here\n```"));
    }

    #[test]
    fn test_heading_line_inside_prose_block_is_protected() {
        let body = "## Tokio basics\nTokio is a runtime.\n";
        let linked = inject(body, &["tokio"], &config());
        assert_eq!(linked.body, "## Tokio basics\n[Tokio](/tokio) is a runtime.\n");
    }

    #[test]
    fn test_overlapping_keywords_are_not_nested() {
        let body = "Async Rust is fun.\n";
        let linked = inject(body, &["async rust", "rust"], &config());
        assert_eq!(linked.links.len(), 1);
        assert_eq!(linked.body, "[Async Rust](/async-rust) is fun.\n");
    }

    #[test]
    fn test_duplicate_keywords_are_linked_once() {
        let body = "Tokio one.\n\nTokio two.\n";
        let linked = inject(body, &["tokio", "Tokio"], &config());
        assert_eq!(linked.links.len(), 1);
        assert!(linked.warnings.is_empty());
    }

    #[test]
    fn test_offsets_account_for_earlier_links() {
        let body = "serde and tokio.\n";
        let linked = inject(body, &["serde", "tokio"], &config());
        for link in &linked.links {
            let expected = format!("[{}]({})", link.anchor, link.target);
            assert!(linked.body[link.offset..].starts_with(&expected));
        }
    }
}
