//! Scripted generation provider for tests
//!
//! Recognizes the stage a prompt belongs to from its instruction line,
//! replays queued outcomes per stage and falls back to a canned response
//! that passes every structural check.

use async_trait::async_trait;
use quill_core::domain::stage::StageKind;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::markdown::count_words;
use crate::prompts;
use crate::provider::{GenerationProvider, ProviderError};

/// Top-level heading of [`sample_article`]
pub const SAMPLE_TITLE: &str = "A Practical Guide to Async Rust";

pub const SAMPLE_SEO_TITLE: &str = "Getting Started with Tokio for Async Rust";

const SAMPLE_SECTIONS: [&str; 3] = ["Why Tokio", "Working with Futures", "Putting It Together"];

const SAMPLE_SENTENCES: [&str; 5] = [
    "Tokio schedules many small tasks across a pool of worker threads.",
    "Futures describe work that finishes later without blocking the calling thread.",
    "Careful error handling keeps long running services stable under heavy load.",
    "Channels let independent tasks share results without reaching for locks.",
    "Timeouts and cancellation make slow network calls much easier to manage.",
];

/// Builds a Markdown article of roughly `target_words` words with one H1
/// and three H2 sections
pub fn sample_article(target_words: usize) -> String {
    let heading_words = count_words(SAMPLE_TITLE)
        + SAMPLE_SECTIONS.iter().map(|h| count_words(h)).sum::<usize>();
    let per_section = target_words.saturating_sub(heading_words) / SAMPLE_SECTIONS.len();

    let mut body = format!("# {}\n", SAMPLE_TITLE);

    for heading in SAMPLE_SECTIONS {
        body.push_str(&format!("\n## {}\n\n", heading));

        let mut words = 0;
        let mut in_paragraph = 0;
        for sentence in SAMPLE_SENTENCES.iter().cycle() {
            let n = count_words(sentence);
            if words > 0 && words + n > per_section {
                break;
            }

            if in_paragraph == 3 {
                body.push_str("\n\n");
                in_paragraph = 0;
            } else if in_paragraph > 0 {
                body.push(' ');
            }

            body.push_str(sentence);
            words += n;
            in_paragraph += 1;
        }

        body.push('\n');
    }

    body
}

#[derive(Default)]
struct ScriptState {
    scripted: HashMap<StageKind, VecDeque<Result<String, ProviderError>>>,
    calls: HashMap<StageKind, u32>,
}

/// Provider replaying scripted outcomes per stage
#[derive(Default)]
pub struct ScriptedProvider {
    state: Mutex<ScriptState>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an outcome for the next call of `stage`
    pub fn push(&self, stage: StageKind, outcome: Result<String, ProviderError>) {
        self.lock()
            .scripted
            .entry(stage)
            .or_default()
            .push_back(outcome);
    }

    /// Makes the next `times` calls of `stage` fail
    pub fn fail_times(&self, stage: StageKind, times: u32, transient: bool) {
        for i in 0..times {
            let message = format!("scripted {} failure {}", stage, i + 1);
            let error = if transient {
                ProviderError::Transient(message)
            } else {
                ProviderError::Permanent(message)
            };
            self.push(stage, Err(error));
        }
    }

    pub fn calls(&self, stage: StageKind) -> u32 {
        self.lock().calls.get(&stage).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.lock().calls.values().sum()
    }

    /// Stage a prompt was built for
    pub fn stage_of(prompt: &str) -> Option<StageKind> {
        if prompt.starts_with(prompts::RESEARCH_INSTRUCTION) {
            Some(StageKind::Research)
        } else if prompt.starts_with(prompts::DRAFT_INSTRUCTION) {
            Some(StageKind::Draft)
        } else if prompt.starts_with(prompts::SEO_INSTRUCTION) {
            Some(StageKind::SeoPolish)
        } else {
            None
        }
    }

    fn default_response(stage: StageKind) -> String {
        match stage {
            StageKind::Research => SAMPLE_SECTIONS
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. {}", i + 1, s))
                .collect::<Vec<_>>()
                .join("\n"),
            StageKind::SeoPolish => format!(
                "TITLE: {}\nMETA: A practical introduction to the Tokio runtime covering tasks, \
                 futures and the patterns that keep services fast.",
                SAMPLE_SEO_TITLE
            ),
            _ => sample_article(300),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
        let stage = Self::stage_of(prompt)
            .ok_or_else(|| ProviderError::Permanent("unrecognized prompt".to_string()))?;

        let mut state = self.lock();
        *state.calls.entry(stage).or_default() += 1;

        match state.scripted.get_mut(&stage).and_then(VecDeque::pop_front) {
            Some(outcome) => outcome,
            None => Ok(Self::default_response(stage)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::count_headings;

    #[test]
    fn test_sample_article_hits_target() {
        let article = sample_article(300);
        let words = count_words(&article);
        assert!((260..=300).contains(&words), "got {} words", words);
        assert_eq!(count_headings(&article, 1), 1);
        assert_eq!(count_headings(&article, 2), 3);
    }

    #[tokio::test]
    async fn test_scripted_outcomes_then_default() {
        let provider = ScriptedProvider::new();
        provider.fail_times(StageKind::Draft, 1, true);
        let prompt = format!("{}\n\nTopic: x", prompts::DRAFT_INSTRUCTION);

        assert!(provider.generate(&prompt, 10).await.is_err());
        assert!(provider.generate(&prompt, 10).await.unwrap().contains(SAMPLE_TITLE));
        assert_eq!(provider.calls(StageKind::Draft), 2);
        assert_eq!(provider.total_calls(), 2);
    }
}
