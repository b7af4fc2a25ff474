//! Stage domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::warning::StructuralWarning;

/// The fixed set of pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Research,
    Draft,
    SeoPolish,
    Structure,
    InternalLinks,
    Scoring,
}

impl StageKind {
    /// All stages in execution order
    pub const ALL: [StageKind; 6] = [
        StageKind::Research,
        StageKind::Draft,
        StageKind::SeoPolish,
        StageKind::Structure,
        StageKind::InternalLinks,
        StageKind::Scoring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Research => "research",
            StageKind::Draft => "draft",
            StageKind::SeoPolish => "seo_polish",
            StageKind::Structure => "structure",
            StageKind::InternalLinks => "internal_links",
            StageKind::Scoring => "scoring",
        }
    }

    /// Whether the stage calls the generation provider
    pub fn calls_provider(&self) -> bool {
        matches!(
            self,
            StageKind::Research | StageKind::Draft | StageKind::SeoPolish
        )
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{}'", s))
    }
}

/// Output of one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageKind,

    /// Textual output handed to the next stage
    pub output: String,

    /// Numeric metrics (word count, heading count, ...)
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,

    #[serde(default)]
    pub warnings: Vec<StructuralWarning>,

    /// Provider calls the stage needed (0 for pure stages)
    #[serde(default)]
    pub provider_calls: u32,
}

impl StageResult {
    pub fn new(stage: StageKind, output: impl Into<String>) -> Self {
        Self {
            stage,
            output: output.into(),
            metrics: BTreeMap::new(),
            warnings: Vec::new(),
            provider_calls: 0,
        }
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}
