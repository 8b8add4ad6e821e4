use indexmap::IndexMap;

pub const CAPABILITY_VISION: &str = "vision";
pub const CAPABILITY_SEARCH: &str = "search";
pub const CAPABILITY_TEXT: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub context_window: Option<u64>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if model.supports(capability) {
            return Some(model.clone());
        }
        None
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, capabilities: &[&str], context_window: Option<u64>| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: "gemini".to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
                context_window,
            },
        );
    };

    // Order matters: the first capable entry is the fallback for unknown names.
    insert(
        "gemini-2.0-flash-exp",
        &[CAPABILITY_VISION, CAPABILITY_TEXT],
        Some(1_048_576),
    );
    insert(
        "gemini-3-flash-preview",
        &[CAPABILITY_SEARCH, CAPABILITY_TEXT, CAPABILITY_VISION],
        Some(1_048_576),
    );
    insert(
        "gemini-2.5-flash",
        &[CAPABILITY_VISION, CAPABILITY_SEARCH, CAPABILITY_TEXT],
        Some(1_048_576),
    );
    insert(
        "gemini-2.5-pro",
        &[CAPABILITY_VISION, CAPABILITY_SEARCH, CAPABILITY_TEXT],
        Some(1_048_576),
    );

    map
}
