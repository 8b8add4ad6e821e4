#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArgShape {
    /// Free text, taken verbatim after trimming.
    Raw,
    /// One path; quoting is honoured.
    Path,
    None,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub aliases: &'static [&'static str],
    pub shape: ArgShape,
    pub usage: &'static str,
}

impl CommandSpec {
    pub fn matches(&self, command: &str) -> bool {
        self.command == command || self.aliases.iter().any(|alias| *alias == command)
    }
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "lang",
        aliases: &["language"],
        shape: ArgShape::Raw,
        usage: "/lang [en|bn]",
    },
    CommandSpec {
        command: "chart",
        aliases: &["image"],
        shape: ArgShape::Path,
        usage: "/chart <image path>",
    },
    CommandSpec {
        command: "symbol",
        aliases: &["pair", "scan"],
        shape: ArgShape::Raw,
        usage: "/symbol <SYMBOL>",
    },
    CommandSpec {
        command: "explain",
        aliases: &[],
        shape: ArgShape::Raw,
        usage: "/explain <pattern name>",
    },
    CommandSpec {
        command: "patterns",
        aliases: &[],
        shape: ArgShape::None,
        usage: "/patterns",
    },
    CommandSpec {
        command: "pattern",
        aliases: &[],
        shape: ArgShape::Raw,
        usage: "/pattern <id>",
    },
    CommandSpec {
        command: "status",
        aliases: &[],
        shape: ArgShape::None,
        usage: "/status",
    },
    CommandSpec {
        command: "cancel",
        aliases: &["dismiss"],
        shape: ArgShape::None,
        usage: "/cancel",
    },
    CommandSpec {
        command: "help",
        aliases: &[],
        shape: ArgShape::None,
        usage: "/help",
    },
    CommandSpec {
        command: "quit",
        aliases: &["exit"],
        shape: ArgShape::None,
        usage: "/quit",
    },
];

pub(crate) fn find_command(command: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.matches(command))
}

pub fn chat_help_lines() -> Vec<&'static str> {
    COMMANDS.iter().map(|spec| spec.usage).collect()
}
