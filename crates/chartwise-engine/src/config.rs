use std::env;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chartwise_contracts::models::{ModelRoutes, ModelSelector};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Everything the gateway needs from the outside world, resolved once at
/// startup and handed to [`crate::GeminiTransport`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub api_base: String,
    pub models: ModelRoutes,
    /// `None` leaves the HTTP client's own default in charge.
    pub request_timeout: Option<Duration>,
    /// Fallbacks taken while resolving model names.
    pub routing_notes: Vec<String>,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            models: ModelRoutes::default(),
            request_timeout: None,
            routing_notes: Vec::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(non_empty_env)
    }

    /// Builds the config from a key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("GOOGLE_API_KEY"))
            .ok_or_else(|| anyhow!("GEMINI_API_KEY or GOOGLE_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Some(base) = lookup("GEMINI_API_BASE") {
            config = config.with_api_base(&base);
        }
        if let Some(raw) = lookup("CHARTWISE_REQUEST_TIMEOUT_SECS") {
            let seconds: f64 = raw
                .parse()
                .map_err(|_| anyhow!("CHARTWISE_REQUEST_TIMEOUT_SECS is not a number: {raw}"))?;
            if !seconds.is_finite() || seconds <= 0.0 {
                bail!("CHARTWISE_REQUEST_TIMEOUT_SECS must be positive, got {raw}");
            }
            config.request_timeout = Some(Duration::from_secs_f64(seconds));
        }

        let vision = lookup("CHARTWISE_VISION_MODEL");
        let text = lookup("CHARTWISE_TEXT_MODEL");
        config.route_models(vision.as_deref(), text.as_deref())
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        let trimmed = base.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.api_base = trimmed.to_string();
        }
        self
    }

    /// Resolves requested model names against the registry. Unknown names
    /// fall back to a capable default and leave a note; notes from an earlier
    /// routing are replaced.
    pub fn route_models(mut self, vision: Option<&str>, text: Option<&str>) -> Result<Self> {
        let (routes, notes) = ModelSelector::new(None)
            .routes(vision, text)
            .map_err(anyhow::Error::msg)?;
        self.models = routes;
        self.routing_notes = notes;
        Ok(self)
    }
}

/// Trimmed value of `key`, or `None` when unset or blank.
pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
