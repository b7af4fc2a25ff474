//! Markdown helpers
//!
//! Just enough Markdown understanding for the structure, link and scoring
//! passes: ATX headings, fenced code blocks and blank-line separated blocks.

use quill_core::domain::document::Heading;
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Kind of a blank-line separated block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Running text; eligible for links and counted as a paragraph
    Prose,
    /// Only heading lines
    Heading,
    /// Contains a fenced code block
    Code,
}

/// A blank-line separated block of the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub range: Range<usize>,
    pub kind: BlockKind,
}

/// Returns the level and text of an ATX heading line
pub fn heading_level(line: &str) -> Option<(u8, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }

    let rest = &line[indent..];
    let hashes = rest.len() - rest.trim_start_matches('#').len();
    if hashes == 0 || hashes > 6 {
        return None;
    }

    let text = &rest[hashes..];
    if !text.is_empty() && !text.starts_with([' ', '\t']) {
        return None;
    }

    let text = text.trim().trim_end_matches('#').trim_end();
    Some((hashes as u8, text))
}

/// Whether the line opens or closes a fenced code block
pub fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Iterates lines with their starting byte offset, without line endings
pub fn lines_with_offsets(body: &str) -> impl Iterator<Item = (usize, &str)> {
    body.split_inclusive('\n').scan(0usize, |offset, raw| {
        let start = *offset;
        *offset += raw.len();
        Some((start, raw.trim_end_matches(['\n', '\r'])))
    })
}

/// All headings outside fenced code, in document order
pub fn headings(body: &str) -> Vec<Heading> {
    let mut in_fence = false;
    let mut result = Vec::new();

    for (_, line) in lines_with_offsets(body) {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some((level, text)) = heading_level(line) {
            if !text.is_empty() {
                result.push(Heading {
                    level,
                    text: text.to_string(),
                });
            }
        }
    }

    result
}

/// Text of the first top-level heading
pub fn first_h1(body: &str) -> Option<String> {
    headings(body)
        .into_iter()
        .find(|h| h.level == 1)
        .map(|h| h.text)
}

pub fn count_headings(body: &str, level: u8) -> usize {
    headings(body).iter().filter(|h| h.level == level).count()
}

/// Counts words, ignoring tokens without any alphanumeric character
/// (heading markers, bullets, separators)
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count()
}

/// Counts sentences using terminal punctuation; at least 1 for non-empty text
pub fn count_sentences(text: &str) -> usize {
    static SENTENCE_END: OnceLock<Regex> = OnceLock::new();
    let re = SENTENCE_END.get_or_init(|| Regex::new(r"[.!?]+(\s|$)").expect("valid regex"));

    if count_words(text) == 0 {
        return 0;
    }
    re.find_iter(text).count().max(1)
}

/// Splits the body into blank-line separated blocks
///
/// Blank lines inside fenced code do not split a block.
pub fn blocks(body: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut in_fence = false;
    let mut has_code = false;
    let mut only_headings = true;

    for (line_start, line) in lines_with_offsets(body) {
        if line.trim().is_empty() && !in_fence {
            if let Some(s) = start.take() {
                blocks.push(Block {
                    range: s..end,
                    kind: block_kind(has_code, only_headings),
                });
            }
            continue;
        }

        if start.is_none() {
            start = Some(line_start);
            has_code = false;
            only_headings = true;
        }

        if is_fence(line) {
            in_fence = !in_fence;
            has_code = true;
        } else if in_fence || heading_level(line).is_none() {
            only_headings = false;
        }

        end = line_start + line.len();
    }

    if let Some(s) = start {
        blocks.push(Block {
            range: s..end,
            kind: block_kind(has_code, only_headings),
        });
    }

    blocks
}

fn block_kind(has_code: bool, only_headings: bool) -> BlockKind {
    if has_code {
        BlockKind::Code
    } else if only_headings {
        BlockKind::Heading
    } else {
        BlockKind::Prose
    }
}

/// Finds `term` in `text` at or after byte `from`
///
/// Matching is ASCII case-insensitive and only accepts whole-word
/// occurrences.
pub fn find_term(text: &str, term: &str, from: usize) -> Option<Range<usize>> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }

    let haystack = text.to_ascii_lowercase();
    let needle = term.to_ascii_lowercase();
    let mut pos = from;

    while let Some(found) = haystack.get(pos..)?.find(&needle) {
        let start = pos + found;
        let end = start + needle.len();
        if is_word_boundary(text, start, end) {
            return Some(start..end);
        }
        pos = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }

    None
}

/// Number of whole-word occurrences of `term`
pub fn count_term(text: &str, term: &str) -> usize {
    let mut count = 0;
    let mut pos = 0;
    while let Some(range) = find_term(text, term, pos) {
        count += 1;
        pos = range.end;
    }
    count
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Prose text of the body: heading lines and fenced code removed
pub fn prose_text(body: &str) -> String {
    let mut in_fence = false;
    let mut out = String::with_capacity(body.len());

    for (_, line) in lines_with_offsets(body) {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || heading_level(line).is_some() {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_parsing() {
        assert_eq!(heading_level("# Title"), Some((1, "Title")));
        assert_eq!(heading_level("### Deep ###"), Some((3, "Deep")));
        assert_eq!(heading_level("  ## Indented"), Some((2, "Indented")));
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("####### seven"), None);
        assert_eq!(heading_level("plain text"), None);
    }

    #[test]
    fn test_headings_skip_fenced_code() {
        let body = "# Title\n\n```\n## not a heading\n```\n\n## Real\n";
        let found = headings(body);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].text, "Real");
    }

    #[test]
    fn test_first_h1() {
        assert_eq!(
            first_h1("intro\n\n## Sub\n\n# Main\n"),
            Some("Main".to_string())
        );
        assert_eq!(first_h1("## Only sub"), None);
    }

    #[test]
    fn test_count_words_ignores_markers() {
        assert_eq!(count_words("## Heading here\n- item one\n---"), 4);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_count_sentences() {
        assert_eq!(count_sentences("One. Two! Three?"), 3);
        assert_eq!(count_sentences("no terminal punctuation"), 1);
        assert_eq!(count_sentences("Version 1.2 is out."), 1);
        assert_eq!(count_sentences(""), 0);
    }

    #[test]
    fn test_blocks_classification() {
        let body = "# Title\n\nFirst paragraph.\n\n```rust\nlet x = 1;\n\nlet y = 2;\n```\n\n## Heading\nText under heading.\n";
        let found = blocks(body);
        assert_eq!(found.len(), 4);
        assert_eq!(found[0].kind, BlockKind::Heading);
        assert_eq!(found[1].kind, BlockKind::Prose);
        assert_eq!(&body[found[1].range.clone()], "First paragraph.");
        assert_eq!(found[2].kind, BlockKind::Code);
        assert_eq!(found[3].kind, BlockKind::Prose);
    }

    #[test]
    fn test_find_term_whole_words_only() {
        let text = "Rustaceans love Rust. rust is fast";
        assert_eq!(find_term(text, "rust", 0), Some(16..20));
        assert_eq!(find_term(text, "RUST", 17), Some(22..26));
        assert_eq!(find_term(text, "go", 0), None);
        assert_eq!(count_term(text, "rust"), 2);
    }

    #[test]
    fn test_find_term_multi_word() {
        let text = "Learning async rust with tokio.";
        assert_eq!(find_term(text, "Async Rust", 0), Some(9..19));
        assert_eq!(find_term(text, "  ", 0), None);
    }

    #[test]
    fn test_prose_text_drops_headings_and_code() {
        let body = "# Title\nBody line.\n```\ncode\n```\n";
        assert_eq!(prose_text(body), "Body line.\n");
    }
}
