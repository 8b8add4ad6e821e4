use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::{ColorTag, Trend};

const BUILTIN_PATTERNS_JSON: &str = include_str!("../resources/patterns.json");
const VIDEO_EMBED_BASE: &str = "https://www.youtube.com/embed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDetails {
    pub meaning: String,
    pub example: String,
    pub action: String,
    pub stop_loss: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCatalogEntry {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
    pub video_id: String,
    pub details: PatternDetails,
    pub color: ColorTag,
}

impl PatternCatalogEntry {
    /// Direction implied by the category label; anything neither bullish nor
    /// bearish reads as sideways.
    pub fn bias(&self) -> Trend {
        if self.category.contains("Bullish") {
            Trend::Bullish
        } else if self.category.contains("Bearish") {
            Trend::Bearish
        } else {
            Trend::Sideways
        }
    }

    pub fn video_embed_url(&self) -> String {
        format!("{VIDEO_EMBED_BASE}/{}", self.video_id)
    }
}

/// Static candlestick reference table, kept in declaration order.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    entries: IndexMap<String, PatternCatalogEntry>,
}

impl PatternCatalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_PATTERNS_JSON).context("bundled pattern catalogue is invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("invalid catalogue {}", path.display()))
    }

    /// Loads `path` when given, otherwise the bundled table.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let rows: Vec<PatternCatalogEntry> = serde_json::from_str(raw)?;
        let mut entries = IndexMap::new();
        for row in rows {
            let id = row.id.trim().to_string();
            if id.is_empty() {
                bail!("pattern '{}' has an empty id", row.name);
            }
            if entries.contains_key(&id) {
                bail!("duplicate pattern id '{id}'");
            }
            entries.insert(id, row);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&PatternCatalogEntry> {
        self.entries.get(id.trim())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PatternCatalogEntry> {
        let wanted = name.trim();
        self.entries
            .values()
            .find(|entry| entry.name.eq_ignore_ascii_case(wanted))
    }

    /// Lookup by id first, then by display name.
    pub fn resolve(&self, key: &str) -> Option<&PatternCatalogEntry> {
        self.get(key).or_else(|| self.find_by_name(key))
    }

    pub fn list(&self) -> impl Iterator<Item = &PatternCatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
