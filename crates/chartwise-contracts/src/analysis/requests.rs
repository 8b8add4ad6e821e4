use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::locale::Locale;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Base64 image payload plus its mime type, ready for an `inlineData` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    mime_type: String,
    data: String,
}

impl ChartImage {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        let mime_type = mime_type.trim();
        Self {
            mime_type: if mime_type.is_empty() {
                DEFAULT_IMAGE_MIME.to_string()
            } else {
                mime_type.to_string()
            },
            data: BASE64.encode(bytes),
        }
    }

    /// Accepts `data:<mime>;base64,<payload>`. Input without that prefix is
    /// taken whole as the payload, typed as [`DEFAULT_IMAGE_MIME`].
    pub fn from_data_url(raw: &str) -> Self {
        match split_data_url(raw) {
            Some((mime_type, data)) => Self {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            },
            None => Self {
                mime_type: DEFAULT_IMAGE_MIME.to_string(),
                data: raw.to_string(),
            },
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.trim().is_empty()
    }
}

/// Splits a base64 data-URL into `(mime, payload)`; both must be non-empty.
pub fn split_data_url(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("data:")?;
    let (mime_type, data) = rest.rsplit_once(";base64,")?;
    if mime_type.is_empty() || data.is_empty() {
        return None;
    }
    Some((mime_type, data))
}

/// Trims and uppercases a market symbol. Blank input yields `None`.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ChartAnalysis,
    SymbolAnalysis,
    PatternExplain,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ChartAnalysis => "chart_analysis",
            Operation::SymbolAnalysis => "symbol_analysis",
            Operation::PatternExplain => "pattern_explain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    Chart { image: ChartImage, locale: Locale },
    Symbol { symbol: String, locale: Locale },
    PatternExplain { pattern_name: String, locale: Locale },
}

impl AnalysisRequest {
    pub fn chart(image: ChartImage, locale: Locale) -> Result<Self, String> {
        if image.is_empty() {
            return Err("Chart image payload is empty.".to_string());
        }
        Ok(Self::Chart { image, locale })
    }

    pub fn symbol(raw: &str, locale: Locale) -> Result<Self, String> {
        let symbol = normalize_symbol(raw).ok_or_else(|| "Symbol must not be empty.".to_string())?;
        Ok(Self::Symbol { symbol, locale })
    }

    pub fn pattern(raw: &str, locale: Locale) -> Result<Self, String> {
        let pattern_name = raw.trim();
        if pattern_name.is_empty() {
            return Err("Pattern name must not be empty.".to_string());
        }
        Ok(Self::PatternExplain {
            pattern_name: pattern_name.to_string(),
            locale,
        })
    }

    pub fn locale(&self) -> Locale {
        match self {
            Self::Chart { locale, .. }
            | Self::Symbol { locale, .. }
            | Self::PatternExplain { locale, .. } => *locale,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Chart { .. } => Operation::ChartAnalysis,
            Self::Symbol { .. } => Operation::SymbolAnalysis,
            Self::PatternExplain { .. } => Operation::PatternExplain,
        }
    }
}
