mod command_registry;
mod intent_parser;

pub use command_registry::chat_help_lines;
pub use intent_parser::{parse_intent, ChatAction, Intent};

/// Symbols offered as quick picks in the market scanner.
pub const SYMBOL_SUGGESTIONS: &[&str] = &["EURUSD", "BTCUSD", "XAUUSD", "GBPUSD"];
