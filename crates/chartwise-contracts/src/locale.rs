use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language the model is asked to write narrative fields in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "bn")]
    Bangla,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::English, Locale::Bangla];

    pub fn code(self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Bangla => "bn",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Locale::English => Locale::Bangla,
            Locale::Bangla => Locale::English,
        }
    }

    /// Label used in the `Language:` line of every prompt.
    pub fn prompt_language(self) -> &'static str {
        match self {
            Locale::English => "English",
            Locale::Bangla => "Bangla (Bengali)",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Locale::English => "English",
            Locale::Bangla => "Bangla",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Locale::ALL
            .into_iter()
            .find(|locale| locale.code() == normalized)
            .ok_or_else(|| format!("Unsupported locale '{}'; expected 'en' or 'bn'.", raw.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::Locale;

    #[test]
    fn default_is_english() {
        assert_eq!(Locale::default(), Locale::English);
    }

    #[test]
    fn toggle_flips_and_returns() {
        for locale in Locale::ALL {
            assert_ne!(locale.toggle(), locale);
            assert_eq!(locale.toggle().toggle(), locale);
        }
    }

    #[test]
    fn parses_codes_loosely() {
        assert_eq!(" BN ".parse::<Locale>(), Ok(Locale::Bangla));
        assert_eq!("en".parse::<Locale>(), Ok(Locale::English));
        for locale in Locale::ALL {
            assert_eq!(locale.code().parse::<Locale>(), Ok(locale));
        }
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn serializes_as_code() {
        assert_eq!(
            serde_json::to_value(Locale::Bangla).unwrap_or_default(),
            serde_json::json!("bn")
        );
    }
}
