//! Pipeline configuration
//!
//! Every switch the stage orchestrator honours lives here and is passed in
//! at construction time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Stage orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the research/outline stage
    pub enable_research: bool,

    /// Run the SEO polish stage (title fallback still applies when disabled)
    pub enable_seo_polish: bool,

    /// Run internal link injection
    pub enable_internal_links: bool,

    /// In-process retries per provider call, on top of the first call
    pub stage_retries: u32,

    /// Delay before the first retry, doubled on each further retry
    pub retry_backoff_ms: u64,

    /// Upper bound for the retry delay
    pub max_retry_backoff_ms: u64,

    pub research_max_tokens: u32,
    pub seo_max_tokens: u32,

    /// Token budget for the draft; derived from the word target when unset
    pub draft_max_tokens: Option<u32>,

    /// Allowed relative deviation from the target word count
    pub word_count_tolerance: f64,

    pub min_h2_headings: usize,
    pub max_links_total: usize,
    pub max_links_per_paragraph: usize,

    /// Prefix prepended to keyword slugs when building link targets
    pub link_base_path: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_research: true,
            enable_seo_polish: true,
            enable_internal_links: true,
            stage_retries: 2,
            retry_backoff_ms: 500,
            max_retry_backoff_ms: 8_000,
            research_max_tokens: 1_024,
            seo_max_tokens: 256,
            draft_max_tokens: None,
            word_count_tolerance: 0.25,
            min_h2_headings: 3,
            max_links_total: 5,
            max_links_per_paragraph: 2,
            link_base_path: "/".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Retry policy shared by every provider-backed stage
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.stage_retries,
            Duration::from_millis(self.retry_backoff_ms),
            Duration::from_millis(self.max_retry_backoff_ms),
        )
    }

    /// Token budget for the draft stage
    pub fn draft_tokens(&self, target_word_count: u32) -> u32 {
        self.draft_max_tokens
            .unwrap_or_else(|| (target_word_count.saturating_mul(2)).max(1_024))
    }

    /// Inclusive word count band around a target
    pub fn word_band(&self, target_word_count: u32) -> (usize, usize) {
        let target = target_word_count as f64;
        let min = (target * (1.0 - self.word_count_tolerance)).ceil() as usize;
        let max = (target * (1.0 + self.word_count_tolerance)).floor() as usize;
        (min, max)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.word_count_tolerance) {
            return Err("word_count_tolerance must be in [0, 1)".to_string());
        }

        if self.min_h2_headings == 0 {
            return Err("min_h2_headings must be greater than 0".to_string());
        }

        if self.max_links_per_paragraph > self.max_links_total {
            return Err("max_links_per_paragraph cannot exceed max_links_total".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.stage_retries, 2);
        assert_eq!(config.min_h2_headings, 3);
        assert_eq!(config.max_links_total, 5);
        assert_eq!(config.max_links_per_paragraph, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_word_band_for_300_words() {
        let config = PipelineConfig::default();
        assert_eq!(config.word_band(300), (225, 375));
    }

    #[test]
    fn test_draft_tokens_derived_from_target() {
        let config = PipelineConfig::default();
        assert_eq!(config.draft_tokens(300), 1_024);
        assert_eq!(config.draft_tokens(2_000), 4_000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();
        config.word_count_tolerance = 1.5;
        assert!(config.validate().is_err());

        config.word_count_tolerance = 0.25;
        config.max_links_per_paragraph = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"enable_research": false}"#).unwrap();
        assert!(!config.enable_research);
        assert_eq!(config.stage_retries, 2);
    }
}
