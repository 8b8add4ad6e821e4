use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

impl Trend {
    pub const ALL: [Trend; 3] = [Trend::Bullish, Trend::Bearish, Trend::Sideways];

    pub fn label(self) -> &'static str {
        match self {
            Trend::Bullish => "Bullish",
            Trend::Bearish => "Bearish",
            Trend::Sideways => "Sideways",
        }
    }

    pub fn color_tag(self) -> ColorTag {
        match self {
            Trend::Bullish => ColorTag::Emerald,
            Trend::Bearish => ColorTag::Rose,
            Trend::Sideways => ColorTag::Yellow,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Trend {
    type Err = String;

    /// Case-insensitive match against the three labels. Anything else is refused.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Trend::ALL
            .into_iter()
            .find(|trend| trend.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                format!("'{trimmed}' is not one of \"Bullish\" | \"Bearish\" | \"Sideways\"")
            })
    }
}

/// Presentation tag shared by trend readouts and catalogue entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Emerald,
    Rose,
    Yellow,
}

impl ColorTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorTag::Emerald => "emerald",
            ColorTag::Rose => "rose",
            ColorTag::Yellow => "yellow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorTag, Trend};

    #[test]
    fn parses_labels_case_insensitively() {
        assert_eq!("bullish".parse::<Trend>(), Ok(Trend::Bullish));
        assert_eq!(" BEARISH ".parse::<Trend>(), Ok(Trend::Bearish));
        assert_eq!("Sideways".parse::<Trend>(), Ok(Trend::Sideways));
    }

    #[test]
    fn refuses_unknown_labels() {
        let err = "Moon".parse::<Trend>().err().unwrap_or_default();
        assert!(err.contains("'Moon'"));
        assert!("".parse::<Trend>().is_err());
    }

    #[test]
    fn trend_colors_follow_direction() {
        assert_eq!(Trend::Bullish.color_tag(), ColorTag::Emerald);
        assert_eq!(Trend::Bearish.color_tag(), ColorTag::Rose);
        assert_eq!(Trend::Sideways.color_tag(), ColorTag::Yellow);
    }

    #[test]
    fn serializes_as_bare_label() {
        assert_eq!(
            serde_json::to_string(&Trend::Sideways).unwrap_or_default(),
            "\"Sideways\""
        );
        assert_eq!(
            serde_json::to_string(&ColorTag::Rose).unwrap_or_default(),
            "\"rose\""
        );
    }
}
