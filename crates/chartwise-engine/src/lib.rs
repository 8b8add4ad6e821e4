mod config;
mod error;
mod gateway;
mod gemini;
pub mod prompts;
pub mod reply;
mod session;
#[cfg(test)]
mod testing;

pub use config::{non_empty_env, GatewayConfig, DEFAULT_API_BASE};
pub use error::{ErrorKind, GatewayError};
pub use gateway::{ModelCall, ModelGateway, ModelTransport};
pub use gemini::{build_payload, extract_reply_text, GeminiTransport};
pub use session::{AnalysisSession, SessionOutcome};
