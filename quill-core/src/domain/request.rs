//! Generation request domain types

use serde::{Deserialize, Serialize};

use crate::domain::document::is_placeholder_title;

/// Smallest target word count accepted for a request
pub const MIN_TARGET_WORDS: u32 = 100;

/// Largest target word count accepted for a request
pub const MAX_TARGET_WORDS: u32 = 10_000;

/// Immutable input to a generation run
///
/// Keywords are ranked: the first keyword is the most relevant one and is
/// linked first when the link budget is scarce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub target_word_count: u32,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub flags: StructureFlags,
}

/// Writing tone requested for the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Conversational,
    Technical,
    Friendly,
    Persuasive,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tone::Professional => write!(f, "professional"),
            Tone::Conversational => write!(f, "conversational"),
            Tone::Technical => write!(f, "technical"),
            Tone::Friendly => write!(f, "friendly"),
            Tone::Persuasive => write!(f, "persuasive"),
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "conversational" => Ok(Tone::Conversational),
            "technical" => Ok(Tone::Technical),
            "friendly" => Ok(Tone::Friendly),
            "persuasive" => Ok(Tone::Persuasive),
            other => Err(format!("unknown tone '{}'", other)),
        }
    }
}

/// Structural switches for the generated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructureFlags {
    /// Request a "Frequently Asked Questions" section
    #[serde(default)]
    pub include_faq: bool,

    /// Request a closing conclusion section
    #[serde(default)]
    pub include_conclusion: bool,
}

impl GenerationRequest {
    /// Creates a request with default tone and flags
    pub fn new(topic: impl Into<String>, keywords: Vec<String>, target_word_count: u32) -> Self {
        Self {
            topic: topic.into(),
            keywords,
            target_word_count,
            tone: Tone::default(),
            flags: StructureFlags::default(),
        }
    }

    /// Keywords with surrounding whitespace removed and blanks dropped,
    /// in their original rank order
    pub fn ranked_keywords(&self) -> Vec<&str> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Primary (highest ranked) keyword, if any
    pub fn primary_keyword(&self) -> Option<&str> {
        self.ranked_keywords().into_iter().next()
    }

    /// Validates the request before it is accepted
    pub fn validate(&self) -> Result<(), String> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err("topic cannot be empty".to_string());
        }

        if is_placeholder_title(topic) {
            return Err(format!("topic '{}' is a placeholder", topic));
        }

        if self.target_word_count < MIN_TARGET_WORDS || self.target_word_count > MAX_TARGET_WORDS {
            return Err(format!(
                "target_word_count must be between {} and {} (got {})",
                MIN_TARGET_WORDS, MAX_TARGET_WORDS, self.target_word_count
            ));
        }

        Ok(())
    }
}
