use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{ModelCall, ModelTransport};

/// `generateContent` over HTTPS, authenticated with the API key as a query
/// parameter.
pub struct GeminiTransport {
    api_base: String,
    api_key: String,
    http: HttpClient,
}

impl GeminiTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            http: builder.build()?,
        })
    }

    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl ModelTransport for GeminiTransport {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, call: &ModelCall) -> Result<Option<String>, GatewayError> {
        let endpoint = self.endpoint_for_model(&call.model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_payload(call))
            .send()?;
        let payload = response_json_or_error(response)?;
        Ok(extract_reply_text(&payload))
    }
}

/// Request body for `call`: the image part (if any) ahead of the prompt text.
pub fn build_payload(call: &ModelCall) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = call.image.as_ref() {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type(),
                "data": image.data(),
            }
        }));
    }
    parts.push(json!({ "text": call.prompt }));

    let mut payload = Map::new();
    payload.insert(
        "contents".to_string(),
        json!([{ "role": "user", "parts": parts }]),
    );
    if call.json_output {
        payload.insert(
            "generationConfig".to_string(),
            json!({ "responseMimeType": "application/json" }),
        );
    }
    if call.web_search {
        payload.insert("tools".to_string(), json!([{ "googleSearch": {} }]));
    }
    Value::Object(payload)
}

/// Concatenated text parts of the first candidate. `None` when there are none.
pub fn extract_reply_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, GatewayError> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body: truncate_text(&body, 512),
        });
    }
    serde_json::from_str(&body).map_err(GatewayError::Envelope)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::fs;
    use std::time::Duration;

    use chartwise_contracts::analysis::{ChartImage, Operation};
    use chartwise_contracts::events::EventWriter;
    use chartwise_contracts::Locale;
    use serde_json::json;

    use super::{build_payload, extract_reply_text, truncate_text, GeminiTransport};
    use crate::config::GatewayConfig;
    use crate::error::ErrorKind;
    use crate::gateway::{ModelCall, ModelGateway};

    fn call(image: Option<ChartImage>, web_search: bool) -> ModelCall {
        ModelCall {
            operation: Operation::SymbolAnalysis,
            locale: Locale::English,
            model: "gemini-3-flash-preview".to_string(),
            prompt: "Analyze BTCUSD".to_string(),
            image,
            json_output: true,
            web_search,
        }
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_models() -> anyhow::Result<()> {
        let config = GatewayConfig::new("k").with_api_base("http://localhost:9000/v1beta/");
        let transport = GeminiTransport::new(&config)?;
        assert_eq!(
            transport.endpoint_for_model("gemini-2.5-pro"),
            "http://localhost:9000/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert_eq!(
            transport.endpoint_for_model(" models/gemini-2.5-pro "),
            "http://localhost:9000/v1beta/models/gemini-2.5-pro:generateContent"
        );
        Ok(())
    }

    #[test]
    fn connection_failures_do_not_reveal_the_api_key() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let mut config =
            GatewayConfig::new("SECRET-KEY-123").with_api_base("http://127.0.0.1:1/v1beta");
        config.request_timeout = Some(Duration::from_secs(5));
        let gateway =
            ModelGateway::from_config(&config)?.with_events(EventWriter::new(&path, "run-key"));

        let Some(err) = gateway.explain_pattern("Doji", Locale::English).err() else {
            panic!("nothing listens on port 1");
        };
        assert_eq!(err.kind(), ErrorKind::Transport);

        let mut texts = vec![err.to_string(), format!("{err:?}")];
        let mut source = err.source();
        while let Some(cause) = source {
            texts.push(cause.to_string());
            source = cause.source();
        }
        for text in texts {
            assert!(!text.contains("SECRET-KEY-123"), "key leaked: {text}");
        }

        let log = fs::read_to_string(&path)?;
        assert!(log.contains("\"type\":\"gateway_error\""));
        assert!(!log.contains("SECRET-KEY-123"));
        Ok(())
    }

    #[test]
    fn search_payload_has_tool_and_no_image() {
        let payload = build_payload(&call(None, true));
        assert_eq!(
            payload,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": "Analyze BTCUSD" }],
                }],
                "generationConfig": { "responseMimeType": "application/json" },
                "tools": [{ "googleSearch": {} }],
            })
        );
    }

    #[test]
    fn image_part_precedes_text() {
        let image = ChartImage::from_data_url("data:image/webp;base64,UklGR");
        let payload = build_payload(&call(Some(image), false));
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/webp");
        assert_eq!(parts[0]["inlineData"]["data"], "UklGR");
        assert_eq!(parts[1]["text"], "Analyze BTCUSD");
        assert!(payload.get("tools").is_none());
    }

    #[test]
    fn reply_text_joins_first_candidate_parts() {
        let payload = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(extract_reply_text(&payload).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn missing_text_is_none() {
        assert_eq!(extract_reply_text(&json!({})), None);
        assert_eq!(extract_reply_text(&json!({ "candidates": [] })), None);
        let blocked = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(extract_reply_text(&blocked), None);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(600);
        let truncated = truncate_text(&body, 512);
        assert_eq!(truncated.chars().count(), 513);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncate_text("short", 512), "short");
    }
}
