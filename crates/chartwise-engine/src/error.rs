use chartwise_contracts::analysis::Operation;
use thiserror::Error;

/// Coarse classification of [`GatewayError`] for callers that only branch on
/// the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    EmptyResponse,
    MalformedResponse,
    InvalidShape,
    InvalidRequest,
    Busy,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::InvalidShape => "invalid_shape",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Busy => "busy",
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("model request failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("model reply envelope was not valid JSON")]
    Envelope(#[source] serde_json::Error),

    #[error("analysis worker could not start")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("analysis worker stopped unexpectedly")]
    WorkerPanicked,

    #[error("model returned no text")]
    EmptyResponse,

    #[error("model reply is not valid JSON")]
    MalformedResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model reply field '{field}' {reason}")]
    InvalidShape {
        field: String,
        reason: String,
        raw: String,
    },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("an analysis is already in progress")]
    Busy,
}

/// Drops the request URL, which carries the API key as a query parameter.
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.without_url())
    }
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Transport(_)
            | GatewayError::Status { .. }
            | GatewayError::Envelope(_)
            | GatewayError::WorkerSpawn(_)
            | GatewayError::WorkerPanicked => ErrorKind::Transport,
            GatewayError::EmptyResponse => ErrorKind::EmptyResponse,
            GatewayError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            GatewayError::InvalidShape { .. } => ErrorKind::InvalidShape,
            GatewayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            GatewayError::Busy => ErrorKind::Busy,
        }
    }

    /// The model's reply text, for failures that happened after one arrived.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            GatewayError::MalformedResponse { raw, .. } | GatewayError::InvalidShape { raw, .. } => {
                Some(raw.as_str())
            }
            _ => None,
        }
    }

    /// Message shown to end users. Model and transport failures collapse into
    /// one retry hint per operation.
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            GatewayError::InvalidRequest(message) => message.clone(),
            GatewayError::Busy => "An analysis is already running. Please wait.".to_string(),
            _ => match operation {
                Operation::ChartAnalysis => "Failed to analyze chart. Please try again.",
                Operation::SymbolAnalysis => "Failed to analyze symbol. Please try again.",
                Operation::PatternExplain => "Failed to explain pattern. Please try again.",
            }
            .to_string(),
        }
    }

    pub(crate) fn shape(field: &str, reason: impl Into<String>, raw: &str) -> Self {
        GatewayError::InvalidShape {
            field: field.to_string(),
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}
