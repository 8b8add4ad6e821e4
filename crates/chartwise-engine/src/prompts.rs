//! Instruction text sent to the model for each operation.
//!
//! Every prompt names the language for narrative fields and spells out the
//! JSON object the reply must be. Compliance is checked later, when the reply
//! is decoded.

use chartwise_contracts::analysis::{normalize_symbol, AnalysisRequest, Operation};
use chartwise_contracts::Locale;

use crate::error::GatewayError;

const TREND_SHAPE: &str = r#""Bullish" | "Bearish" | "Sideways""#;
const STRICT_JSON_LINE: &str =
    "Reply with one strict JSON object only. No markdown, no code fences, no prose around it.";

/// What the remote call must carry besides the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    /// Image part plus text.
    Vision,
    /// Text with the live web-search tool enabled.
    SearchGrounded,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPrompt {
    pub operation: Operation,
    pub modality: Modality,
    pub text: String,
}

pub fn chart_analysis_prompt(locale: Locale) -> ModelPrompt {
    let schema = render_schema(&[
        ("trend", TREND_SHAPE.to_string()),
        ("confidence", "integer percentage (0-100)".to_string()),
        ("support_levels", "[number]".to_string()),
        ("resistance_levels", "[number]".to_string()),
        (
            "insight",
            quoted("Plain, beginner-friendly advice on what to do next"),
        ),
        (
            "zones_explanation",
            quoted("Short explanation of the key price zones"),
        ),
        (
            "disclaimer",
            quoted(&format!(
                "Standard financial advice disclaimer in {}",
                locale.short_label()
            )),
        ),
    ]);
    let text = [
        "You are a professional technical analyst. Analyze the attached trading chart image."
            .to_string(),
        STRICT_JSON_LINE.to_string(),
        String::new(),
        language_line(locale),
        String::new(),
        format!("Output Schema:\n{schema}"),
    ]
    .join("\n");
    ModelPrompt {
        operation: Operation::ChartAnalysis,
        modality: Modality::Vision,
        text,
    }
}

/// `symbol` is embedded as given; callers pass the normalized form.
pub fn pair_analysis_prompt(symbol: &str, locale: Locale) -> ModelPrompt {
    let schema = render_schema(&[
        ("symbol", quoted(symbol)),
        ("trend", TREND_SHAPE.to_string()),
        ("support", format!("[{}]", quoted("current support level"))),
        (
            "resistance",
            format!("[{}]", quoted("current resistance level")),
        ),
        (
            "scenario",
            quoted("Most likely next move based on the live data"),
        ),
        (
            "explanation",
            quoted("Reasoning that cites current price action and news"),
        ),
    ]);
    let text = [
        format!("Analyze the currency pair / crypto symbol: {symbol}."),
        "Use the Google Search tool to find the LATEST LIVE PRICE, news and technical sentiment right now."
            .to_string(),
        "Do not rely on training data; base the analysis on what the search returns.".to_string(),
        STRICT_JSON_LINE.to_string(),
        String::new(),
        language_line(locale),
        String::new(),
        format!("Output Schema:\n{schema}"),
    ]
    .join("\n");
    ModelPrompt {
        operation: Operation::SymbolAnalysis,
        modality: Modality::SearchGrounded,
        text,
    }
}

pub fn pattern_explain_prompt(pattern_name: &str, locale: Locale) -> ModelPrompt {
    let schema = render_schema(&[
        ("name", quoted(pattern_name)),
        ("meaning", quoted("What the pattern indicates")),
        ("example", quoted("A real-world example scenario")),
        (
            "action",
            quoted("What traders usually do (Buy/Sell/Wait)"),
        ),
    ]);
    let text = [
        format!("Explain the candlestick pattern \"{pattern_name}\"."),
        "Give its trading meaning and an example scenario.".to_string(),
        STRICT_JSON_LINE.to_string(),
        String::new(),
        language_line(locale),
        String::new(),
        format!("Output Schema:\n{schema}"),
    ]
    .join("\n");
    ModelPrompt {
        operation: Operation::PatternExplain,
        modality: Modality::Text,
        text,
    }
}

pub fn build_prompt(request: &AnalysisRequest) -> Result<ModelPrompt, GatewayError> {
    match request {
        AnalysisRequest::Chart { image, locale } => {
            if image.is_empty() {
                return Err(GatewayError::InvalidRequest(
                    "Chart image payload is empty.".to_string(),
                ));
            }
            Ok(chart_analysis_prompt(*locale))
        }
        AnalysisRequest::Symbol { symbol, locale } => {
            let symbol = normalize_symbol(symbol).ok_or_else(|| {
                GatewayError::InvalidRequest("Symbol must not be empty.".to_string())
            })?;
            Ok(pair_analysis_prompt(&symbol, *locale))
        }
        AnalysisRequest::PatternExplain {
            pattern_name,
            locale,
        } => {
            let pattern_name = pattern_name.trim();
            if pattern_name.is_empty() {
                return Err(GatewayError::InvalidRequest(
                    "Pattern name must not be empty.".to_string(),
                ));
            }
            Ok(pattern_explain_prompt(pattern_name, *locale))
        }
    }
}

fn language_line(locale: Locale) -> String {
    format!("Language: {}", locale.prompt_language())
}

fn quoted(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn render_schema(fields: &[(&str, String)]) -> String {
    let body = fields
        .iter()
        .map(|(name, shape)| format!("  \"{name}\": {shape}"))
        .collect::<Vec<String>>()
        .join(",\n");
    format!("{{\n{body}\n}}")
}
