use std::sync::Arc;
use std::time::Instant;

use chartwise_contracts::analysis::{
    normalize_symbol, AnalysisOutput, AnalysisRequest, AnalysisResult, ChartImage, Operation,
    PairAnalysisResult, PatternExplanation,
};
use chartwise_contracts::events::{EventKind, EventPayload, EventWriter};
use chartwise_contracts::models::ModelRoutes;
use chartwise_contracts::Locale;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gemini::{truncate_text, GeminiTransport};
use crate::prompts::{build_prompt, Modality};
use crate::reply::{decode_chart, decode_pair, decode_pattern, parse_reply, ParsedReply};

/// One fully assembled model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCall {
    pub operation: Operation,
    pub locale: Locale,
    pub model: String,
    pub prompt: String,
    pub image: Option<ChartImage>,
    /// Ask the service for a JSON-typed reply body.
    pub json_output: bool,
    /// Enable the live web-search tool.
    pub web_search: bool,
}

impl ModelCall {
    /// Short fingerprint of model, prompt and image, used to correlate log lines.
    pub fn request_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.model.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.prompt.as_bytes());
        if let Some(image) = self.image.as_ref() {
            hasher.update([0u8]);
            hasher.update(image.mime_type().as_bytes());
            hasher.update(image.data().as_bytes());
        }
        hex::encode(&hasher.finalize()[..6])
    }
}

/// Sends one call to a generative model and hands back its reply text.
///
/// `Ok(None)` means the service answered without any text.
pub trait ModelTransport: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, call: &ModelCall) -> Result<Option<String>, GatewayError>;
}

impl<T: ModelTransport + ?Sized> ModelTransport for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, call: &ModelCall) -> Result<Option<String>, GatewayError> {
        (**self).generate(call)
    }
}

/// Turns analysis requests into one model call each and decodes the reply
/// into the typed result. Nothing is retried.
pub struct ModelGateway {
    transport: Box<dyn ModelTransport>,
    models: ModelRoutes,
    events: Option<EventWriter>,
}

impl ModelGateway {
    pub fn new(transport: Box<dyn ModelTransport>, models: ModelRoutes) -> Self {
        Self {
            transport,
            models,
            events: None,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let transport = GeminiTransport::new(config)?;
        Ok(Self::new(Box::new(transport), config.models.clone()))
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn models(&self) -> &ModelRoutes {
        &self.models
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    pub fn analyze_chart(
        &self,
        image: &ChartImage,
        locale: Locale,
    ) -> Result<AnalysisResult, GatewayError> {
        let request = AnalysisRequest::Chart {
            image: image.clone(),
            locale,
        };
        self.execute(&request, decode_chart)
    }

    pub fn analyze_symbol(
        &self,
        symbol: &str,
        locale: Locale,
    ) -> Result<PairAnalysisResult, GatewayError> {
        let request = AnalysisRequest::Symbol {
            symbol: symbol.to_string(),
            locale,
        };
        let requested = normalize_symbol(symbol).unwrap_or_default();
        self.execute(&request, |reply| decode_pair(reply, &requested))
    }

    pub fn explain_pattern(
        &self,
        pattern_name: &str,
        locale: Locale,
    ) -> Result<PatternExplanation, GatewayError> {
        let request = AnalysisRequest::PatternExplain {
            pattern_name: pattern_name.to_string(),
            locale,
        };
        let requested = pattern_name.trim().to_string();
        self.execute(&request, |reply| decode_pattern(reply, &requested))
    }

    pub fn run(&self, request: &AnalysisRequest) -> Result<AnalysisOutput, GatewayError> {
        match request {
            AnalysisRequest::Chart { image, locale } => {
                self.analyze_chart(image, *locale).map(AnalysisOutput::Chart)
            }
            AnalysisRequest::Symbol { symbol, locale } => {
                self.analyze_symbol(symbol, *locale).map(AnalysisOutput::Pair)
            }
            AnalysisRequest::PatternExplain {
                pattern_name,
                locale,
            } => self
                .explain_pattern(pattern_name, *locale)
                .map(AnalysisOutput::Pattern),
        }
    }

    /// The call `run` would send for `request`, without sending it.
    pub fn preview(&self, request: &AnalysisRequest) -> Result<ModelCall, GatewayError> {
        let prompt = build_prompt(request)?;
        let model = match prompt.modality {
            Modality::Vision => &self.models.vision,
            Modality::SearchGrounded => &self.models.search,
            Modality::Text => &self.models.text,
        };
        let image = match request {
            AnalysisRequest::Chart { image, .. } => Some(image.clone()),
            _ => None,
        };
        Ok(ModelCall {
            operation: prompt.operation,
            locale: request.locale(),
            model: model.clone(),
            prompt: prompt.text,
            image,
            json_output: true,
            web_search: prompt.modality == Modality::SearchGrounded,
        })
    }

    fn execute<T>(
        &self,
        request: &AnalysisRequest,
        decode: impl FnOnce(&ParsedReply) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let call = self.preview(request)?;
        let request_id = call.request_id();
        self.record_request(&call, &request_id);

        let started = Instant::now();
        let outcome = self
            .transport
            .generate(&call)
            .and_then(parse_reply)
            .and_then(|reply| {
                let chars = reply.raw.chars().count();
                decode(&reply).map(|result| (result, chars))
            });
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((result, reply_chars)) => {
                self.record(
                    EventKind::GatewayResponse,
                    json!({
                        "operation": call.operation.as_str(),
                        "request_id": request_id,
                        "elapsed_ms": elapsed_ms,
                        "reply_chars": reply_chars,
                    }),
                );
                Ok(result)
            }
            Err(err) => {
                let mut payload = json!({
                    "operation": call.operation.as_str(),
                    "request_id": request_id,
                    "elapsed_ms": elapsed_ms,
                    "kind": err.kind().as_str(),
                    "message": format!("{err}"),
                });
                if let (Some(raw), Some(map)) = (err.raw_reply(), payload.as_object_mut()) {
                    map.insert("raw_reply".to_string(), json!(truncate_text(raw, 512)));
                }
                self.record(EventKind::GatewayError, payload);
                Err(err)
            }
        }
    }

    fn record_request(&self, call: &ModelCall, request_id: &str) {
        self.record(
            EventKind::GatewayRequest,
            json!({
                "operation": call.operation.as_str(),
                "model": call.model,
                "locale": call.locale.code(),
                "request_id": request_id,
                "transport": self.transport.name(),
                "web_search": call.web_search,
                "has_image": call.image.is_some(),
            }),
        );
    }

    fn record(&self, kind: EventKind, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let payload: EventPayload = match payload {
            Value::Object(map) => map,
            _ => EventPayload::new(),
        };
        events.record(kind, payload);
    }
}
