use std::str::FromStr;

use chartwise_contracts::analysis::{
    AnalysisResult, PairAnalysisResult, PatternExplanation, Trend,
};
use serde_json::{Map, Value};

use crate::error::GatewayError;

const FENCE: &str = "```";

/// Removes one enclosing markdown code fence (with an optional `json` tag)
/// and trims. Unfenced text is only trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix(FENCE) {
        body = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = body.strip_suffix(FENCE) {
        body = rest;
    }
    body.trim()
}

/// A non-empty model reply parsed into JSON, with the original text kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub raw: String,
    pub value: Value,
}

pub fn parse_reply(text: Option<String>) -> Result<ParsedReply, GatewayError> {
    let raw = match text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(GatewayError::EmptyResponse),
    };
    match serde_json::from_str::<Value>(strip_code_fences(&raw)) {
        Ok(value) => Ok(ParsedReply { raw, value }),
        Err(source) => Err(GatewayError::MalformedResponse { raw, source }),
    }
}

pub fn decode_chart(reply: &ParsedReply) -> Result<AnalysisResult, GatewayError> {
    let fields = Fields::new(reply)?;
    Ok(AnalysisResult {
        trend: fields.trend()?,
        confidence: fields.confidence()?,
        support_levels: fields.number_list("support_levels")?,
        resistance_levels: fields.number_list("resistance_levels")?,
        insight: fields.text("insight")?,
        zones_explanation: fields.text("zones_explanation")?,
        disclaimer: fields.text("disclaimer")?,
    })
}

/// `requested_symbol` fills in for a reply that omits `symbol`.
pub fn decode_pair(
    reply: &ParsedReply,
    requested_symbol: &str,
) -> Result<PairAnalysisResult, GatewayError> {
    let fields = Fields::new(reply)?;
    Ok(PairAnalysisResult {
        symbol: fields.text_or("symbol", requested_symbol)?,
        trend: fields.trend()?,
        support: fields.text_list("support")?,
        resistance: fields.text_list("resistance")?,
        scenario: fields.text("scenario")?,
        explanation: fields.text("explanation")?,
    })
}

pub fn decode_pattern(
    reply: &ParsedReply,
    requested_name: &str,
) -> Result<PatternExplanation, GatewayError> {
    let fields = Fields::new(reply)?;
    Ok(PatternExplanation {
        name: fields.text_or("name", requested_name)?,
        meaning: fields.text("meaning")?,
        example: fields.text("example")?,
        action: fields.text("action")?,
    })
}

struct Fields<'a> {
    map: &'a Map<String, Value>,
    raw: &'a str,
}

impl<'a> Fields<'a> {
    fn new(reply: &'a ParsedReply) -> Result<Self, GatewayError> {
        let map = reply
            .value
            .as_object()
            .ok_or_else(|| GatewayError::shape("$", "must be a JSON object", &reply.raw))?;
        Ok(Self {
            map,
            raw: &reply.raw,
        })
    }

    fn fail(&self, field: &str, reason: impl Into<String>) -> GatewayError {
        GatewayError::shape(field, reason, self.raw)
    }

    fn required(&self, field: &str) -> Result<&'a Value, GatewayError> {
        match self.map.get(field) {
            Some(Value::Null) | None => Err(self.fail(field, "is missing")),
            Some(value) => Ok(value),
        }
    }

    fn text(&self, field: &str) -> Result<String, GatewayError> {
        self.required(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.fail(field, "must be a string"))
    }

    fn text_or(&self, field: &str, fallback: &str) -> Result<String, GatewayError> {
        match self.map.get(field) {
            Some(Value::Null) | None => Ok(fallback.to_string()),
            Some(Value::String(value)) if value.trim().is_empty() => Ok(fallback.to_string()),
            Some(Value::String(value)) => Ok(value.clone()),
            Some(_) => Err(self.fail(field, "must be a string")),
        }
    }

    fn trend(&self) -> Result<Trend, GatewayError> {
        let label = self
            .required("trend")?
            .as_str()
            .ok_or_else(|| self.fail("trend", "must be a string"))?;
        Trend::from_str(label).map_err(|reason| self.fail("trend", reason))
    }

    /// Rounded and clamped into 0..=100.
    fn confidence(&self) -> Result<u8, GatewayError> {
        let value = self.required("confidence")?;
        let number = as_number(value)
            .ok_or_else(|| self.fail("confidence", "must be a number"))?;
        Ok(number.round().clamp(0.0, 100.0) as u8)
    }

    fn array(&self, field: &str) -> Result<&'a Vec<Value>, GatewayError> {
        self.required(field)?
            .as_array()
            .ok_or_else(|| self.fail(field, "must be an array"))
    }

    fn number_list(&self, field: &str) -> Result<Vec<f64>, GatewayError> {
        self.array(field)?
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                as_number(item)
                    .ok_or_else(|| self.fail(&format!("{field}[{idx}]"), "must be a number"))
            })
            .collect()
    }

    fn text_list(&self, field: &str) -> Result<Vec<String>, GatewayError> {
        self.array(field)?
            .iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::String(value) => Ok(value.clone()),
                Value::Number(value) => Ok(value.to_string()),
                _ => Err(self.fail(&format!("{field}[{idx}]"), "must be a string")),
            })
            .collect()
    }
}

/// Numbers, or strings holding a number (thousands separators allowed).
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned: String = text
                .trim()
                .chars()
                .filter(|ch| *ch != ',' && *ch != '_')
                .collect();
            cleaned.parse::<f64>().ok().filter(|number| number.is_finite())
        }
        _ => None,
    }
}
