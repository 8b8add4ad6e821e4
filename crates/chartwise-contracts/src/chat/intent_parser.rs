use super::command_registry::{find_command, ArgShape};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    Noop,
    /// `None` toggles between the two locales.
    SetLocale(Option<String>),
    AnalyzeChart(String),
    AnalyzeSymbol(String),
    ExplainPattern(String),
    ShowPattern(String),
    ListPatterns,
    Status,
    Cancel,
    Help,
    Quit,
    Unknown { command: String, arg: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: ChatAction,
    pub raw: String,
}

impl Intent {
    fn new(action: ChatAction, raw: &str) -> Self {
        Self {
            action,
            raw: raw.to_string(),
        }
    }
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

fn action_for(command: &str, arg: &str) -> ChatAction {
    match command {
        "lang" => {
            if arg.is_empty() {
                ChatAction::SetLocale(None)
            } else {
                ChatAction::SetLocale(Some(arg.to_string()))
            }
        }
        "chart" => ChatAction::AnalyzeChart(arg.to_string()),
        "symbol" => ChatAction::AnalyzeSymbol(arg.to_string()),
        "explain" => ChatAction::ExplainPattern(arg.to_string()),
        "pattern" => ChatAction::ShowPattern(arg.to_string()),
        "patterns" => ChatAction::ListPatterns,
        "status" => ChatAction::Status,
        "cancel" => ChatAction::Cancel,
        "help" => ChatAction::Help,
        "quit" => ChatAction::Quit,
        _ => ChatAction::Unknown {
            command: command.to_string(),
            arg: arg.to_string(),
        },
    }
}

/// Plain text is a symbol to scan; `/command args` selects anything else.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new(ChatAction::Noop, text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            let Some(spec) = find_command(&command) else {
                return Intent::new(
                    ChatAction::Unknown {
                        command,
                        arg: arg.to_string(),
                    },
                    text,
                );
            };
            let arg = match spec.shape {
                ArgShape::Raw => arg.to_string(),
                ArgShape::Path => parse_single_path_arg(arg),
                ArgShape::None => String::new(),
            };
            return Intent::new(action_for(spec.command, &arg), text);
        }
    }

    Intent::new(ChatAction::AnalyzeSymbol(raw_trimmed.to_string()), text)
}
