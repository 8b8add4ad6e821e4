use serde::{Deserialize, Serialize};

use super::Trend;

/// Reading of an uploaded chart screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub trend: Trend,
    /// Whole percent, 0..=100.
    pub confidence: u8,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub insight: String,
    pub zones_explanation: String,
    pub disclaimer: String,
}

/// Search-grounded reading of a market symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAnalysisResult {
    pub symbol: String,
    pub trend: Trend,
    pub support: Vec<String>,
    pub resistance: Vec<String>,
    pub scenario: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternExplanation {
    pub name: String,
    pub meaning: String,
    pub example: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum AnalysisOutput {
    Chart(AnalysisResult),
    Pair(PairAnalysisResult),
    Pattern(PatternExplanation),
}

impl AnalysisOutput {
    pub fn trend(&self) -> Option<Trend> {
        match self {
            AnalysisOutput::Chart(result) => Some(result.trend),
            AnalysisOutput::Pair(result) => Some(result.trend),
            AnalysisOutput::Pattern(_) => None,
        }
    }
}
