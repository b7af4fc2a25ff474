//! Quality scoring
//!
//! Readability is derived from sentence and paragraph statistics of the
//! prose; SEO from title/meta presence, heading structure, keyword density
//! and links. Both are normalized to 0..=100 and averaged into the
//! composite. Scores are rounded to one decimal so that equal documents
//! always produce equal scores.

use quill_core::domain::document::{QualityScores, is_placeholder_title};
use quill_core::domain::request::GenerationRequest;

use crate::config::PipelineConfig;
use crate::draft::Draft;
use crate::markdown::{self, BlockKind};

/// Sentence length range considered easy to read, in words
const IDEAL_SENTENCE_WORDS: (f64, f64) = (12.0, 20.0);

/// Paragraphs longer than this many sentences count as dense
const MAX_PARAGRAPH_SENTENCES: usize = 4;

const TITLE_CHARS: (usize, usize) = (30, 65);
const META_CHARS: (usize, usize) = (70, 160);

/// Keyword density band, in percent of prose words
const KEYWORD_DENSITY: (f64, f64) = (0.5, 2.5);

/// Scores a finished draft
pub fn score(draft: &Draft, request: &GenerationRequest, config: &PipelineConfig) -> QualityScores {
    let readability = round1(readability(&draft.body));
    let seo = round1(seo(draft, request, config));
    let composite = round1((readability + seo) / 2.0);

    QualityScores {
        readability,
        seo,
        composite,
    }
}

/// Readability score of a Markdown body
pub fn readability(body: &str) -> f64 {
    let prose = markdown::prose_text(body);
    let words = markdown::count_words(&prose);
    let sentences = markdown::count_sentences(&prose);
    if words == 0 || sentences == 0 {
        return 0.0;
    }

    let avg_sentence = words as f64 / sentences as f64;
    let syllables: usize = prose
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .map(count_syllables)
        .sum();

    let flesch = (206.835 - 1.015 * avg_sentence - 84.6 * (syllables as f64 / words as f64))
        .clamp(0.0, 100.0);

    let (low, high) = IDEAL_SENTENCE_WORDS;
    let sentence_score = if avg_sentence < low {
        100.0 - (low - avg_sentence) * 5.0
    } else if avg_sentence > high {
        100.0 - (avg_sentence - high) * 4.0
    } else {
        100.0
    }
    .clamp(0.0, 100.0);

    let paragraphs: Vec<usize> = markdown::blocks(body)
        .into_iter()
        .filter(|b| b.kind == BlockKind::Prose)
        .map(|b| markdown::count_sentences(&markdown::prose_text(&body[b.range])))
        .filter(|&n| n > 0)
        .collect();
    let paragraph_score = if paragraphs.is_empty() {
        0.0
    } else {
        let short = paragraphs
            .iter()
            .filter(|&&n| n <= MAX_PARAGRAPH_SENTENCES)
            .count();
        short as f64 / paragraphs.len() as f64 * 100.0
    };

    0.4 * flesch + 0.3 * sentence_score + 0.3 * paragraph_score
}

/// SEO score out of 100 points
pub fn seo(draft: &Draft, request: &GenerationRequest, config: &PipelineConfig) -> f64 {
    let mut points = 0.0;

    let title = draft.title.as_deref().unwrap_or("").trim();
    if !is_placeholder_title(title) {
        points += 10.0;
        if in_range(title.chars().count(), TITLE_CHARS) {
            points += 10.0;
        }
    }

    let meta = draft.resolved_meta_description();
    if !meta.is_empty() {
        points += 10.0;
        if in_range(meta.chars().count(), META_CHARS) {
            points += 10.0;
        }
    }

    let required = config.min_h2_headings.max(1);
    let h2 = draft.h2_count().min(required);
    points += 20.0 * h2 as f64 / required as f64;

    if let Some(primary) = request.primary_keyword() {
        if markdown::find_term(title, primary, 0).is_some() {
            points += 10.0;
        }

        let density = keyword_density(&draft.body, primary);
        let (low, high) = KEYWORD_DENSITY;
        if (low..=high).contains(&density) {
            points += 20.0;
        } else if density > 0.0 {
            points += 10.0;
        }
    }

    if !draft.links.is_empty() {
        points += 10.0;
    }

    points
}

/// Share of prose words taken by occurrences of `keyword`, in percent
pub fn keyword_density(body: &str, keyword: &str) -> f64 {
    let prose = markdown::prose_text(body);
    let words = markdown::count_words(&prose);
    if words == 0 {
        return 0.0;
    }

    let keyword_words = markdown::count_words(keyword).max(1);
    let occurrences = markdown::count_term(&prose, keyword);
    (occurrences * keyword_words) as f64 / words as f64 * 100.0
}

/// Rough English syllable count: vowel groups, minus a silent trailing e
fn count_syllables(word: &str) -> usize {
    let word: String = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    if word.is_empty() {
        return 1;
    }

    let mut count = 0;
    let mut previous_vowel = false;
    for c in word.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }

    if word.ends_with('e') && !word.ends_with("le") && count > 1 {
        count -= 1;
    }

    count.max(1)
}

fn in_range(value: usize, (low, high): (usize, usize)) -> bool {
    (low..=high).contains(&value)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::domain::document::InjectedLink;

    fn request() -> GenerationRequest {
        GenerationRequest::new("Async Rust", vec!["tokio".into()], 300)
    }

    fn good_draft() -> Draft {
        let paragraph = "Tokio gives Rust programs a fast and reliable async runtime today. \
                         Many teams pick it for network services that must scale well.";
        let body = format!(
            "# Guide\n\n## Why\n\n{p}\n\n## How\n\n{p}\n\n## Next\n\n{p}\n",
            p = paragraph
        );
        Draft {
            title: Some("Getting Started with Tokio for Async Rust".into()),
            meta_description: Some(
                "A practical introduction to the Tokio runtime, covering tasks, \
                 channels and the patterns that keep services fast."
                    .into(),
            ),
            body,
            links: vec![InjectedLink {
                paragraph: 0,
                offset: 0,
                anchor: "Tokio".into(),
                target: "/tokio".into(),
                keyword: "tokio".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_scores_are_bounded_and_composite_is_mean() {
        let scores = score(&good_draft(), &request(), &PipelineConfig::default());
        for value in [scores.readability, scores.seo, scores.composite] {
            assert!((0.0..=100.0).contains(&value));
        }
        let mean = ((scores.readability + scores.seo) / 2.0 * 10.0).round() / 10.0;
        assert!((scores.composite - mean).abs() < 0.11);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let draft = good_draft();
        let a = score(&draft, &request(), &PipelineConfig::default());
        let b = score(&draft, &request(), &PipelineConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_seo_rewards_structure() {
        let config = PipelineConfig::default();
        let good = seo(&good_draft(), &request(), &config);

        let bare = Draft {
            title: Some("Untitled".into()),
            body: "just some words without structure".into(),
            ..Default::default()
        };
        let poor = seo(&bare, &request(), &config);

        assert!(good > poor);
        assert!(good >= 80.0, "good draft scored {}", good);
    }

    #[test]
    fn test_empty_body_has_zero_readability() {
        assert_eq!(readability(""), 0.0);
        assert_eq!(readability("## Only a heading\n"), 0.0);
    }

    #[test]
    fn test_dense_paragraphs_lower_readability() {
        let sentence = "Short clear sentences help readers follow the argument easily. ";
        let airy = format!("{s}{s}\n\n{s}{s}\n", s = sentence);
        let dense = format!("{}\n", sentence.repeat(8));
        assert!(readability(&airy) > readability(&dense));
    }

    #[test]
    fn test_keyword_density() {
        let body = "tokio tokio one two three four five six seven eight";
        assert!((keyword_density(body, "tokio") - 20.0).abs() < 1e-9);
        assert_eq!(keyword_density("", "tokio"), 0.0);
    }

    #[test]
    fn test_count_syllables() {
        assert_eq!(count_syllables("runtime"), 2);
        assert_eq!(count_syllables("cake"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("a"), 1);
    }
}
