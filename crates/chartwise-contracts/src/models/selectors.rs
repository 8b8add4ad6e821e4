use super::registry::{
    ModelRegistry, ModelSpec, CAPABILITY_SEARCH, CAPABILITY_TEXT, CAPABILITY_VISION,
};

pub const DEFAULT_VISION_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        let fallback_reason = if let Some(requested_value) = requested {
            if let Some(model) = self.registry.ensure(requested_value, capability) {
                return Ok(ModelSelection {
                    model,
                    requested: Some(requested_value.to_string()),
                    fallback_reason: None,
                });
            }
            format!("Model '{requested_value}' is not registered for '{capability}'.")
        } else {
            "No model specified; using default.".to_string()
        };

        let Some(model) = self.registry.by_capability(capability).first().cloned() else {
            return Err(format!("No models available for capability '{capability}'."));
        };
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }

    /// Resolves the three gateway routes. The symbol route uses the text
    /// model name but must support search grounding.
    pub fn routes(
        &self,
        vision: Option<&str>,
        text: Option<&str>,
    ) -> Result<(ModelRoutes, Vec<String>), String> {
        let vision = self.select(vision.or(Some(DEFAULT_VISION_MODEL)), CAPABILITY_VISION)?;
        let search = self.select(text.or(Some(DEFAULT_TEXT_MODEL)), CAPABILITY_SEARCH)?;
        let text = self.select(text.or(Some(DEFAULT_TEXT_MODEL)), CAPABILITY_TEXT)?;

        let mut notes = Vec::new();
        for selection in [&vision, &search, &text] {
            if let Some(reason) = selection.fallback_reason.as_ref() {
                let note = format!("{reason} Using '{}'.", selection.model.name);
                if !notes.contains(&note) {
                    notes.push(note);
                }
            }
        }

        Ok((
            ModelRoutes {
                vision: vision.model.name,
                search: search.model.name,
                text: text.model.name,
            },
            notes,
        ))
    }
}

/// Model name per gateway modality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoutes {
    pub vision: String,
    pub search: String,
    pub text: String,
}

impl Default for ModelRoutes {
    fn default() -> Self {
        Self {
            vision: DEFAULT_VISION_MODEL.to_string(),
            search: DEFAULT_TEXT_MODEL.to_string(),
            text: DEFAULT_TEXT_MODEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{ModelRoutes, ModelSelector};
    use crate::models::{ModelRegistry, ModelSpec};

    fn spec(name: &str, capabilities: &[&str]) -> ModelSpec {
        ModelSpec {
            name: name.to_string(),
            provider: "gemini".to_string(),
            capabilities: capabilities.iter().map(|item| item.to_string()).collect(),
            context_window: None,
        }
    }

    #[test]
    fn default_routes_match_registry_defaults() -> Result<(), String> {
        let (routes, notes) = ModelSelector::new(None).routes(None, None)?;
        assert_eq!(routes, ModelRoutes::default());
        assert!(notes.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_model_falls_back_with_note() -> Result<(), String> {
        let (routes, notes) = ModelSelector::new(None).routes(Some("gemini-9-ultra"), None)?;
        assert_eq!(routes.vision, "gemini-2.0-flash-exp");
        assert_eq!(
            notes,
            vec!["Model 'gemini-9-ultra' is not registered for 'vision'. Using 'gemini-2.0-flash-exp'."]
        );
        Ok(())
    }

    #[test]
    fn text_model_without_search_falls_back_for_symbol_route() -> Result<(), String> {
        let mut models = IndexMap::new();
        models.insert("plain".to_string(), spec("plain", &["text", "vision"]));
        models.insert("grounded".to_string(), spec("grounded", &["search", "text"]));
        let selector = ModelSelector::new(Some(ModelRegistry::new(Some(models))));

        let (routes, notes) = selector.routes(Some("plain"), Some("plain"))?;
        assert_eq!(routes.vision, "plain");
        assert_eq!(routes.text, "plain");
        assert_eq!(routes.search, "grounded");
        assert_eq!(notes.len(), 1);
        Ok(())
    }

    #[test]
    fn select_without_capable_model_errors() {
        let mut models = IndexMap::new();
        models.insert("text-only".to_string(), spec("text-only", &["text"]));
        let err = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("text-only"), "vision")
            .err()
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'vision'.");
    }

    #[test]
    fn blank_request_uses_default_with_explanation() -> Result<(), String> {
        let selection = ModelSelector::new(None).select(Some("  "), "search")?;
        assert_eq!(selection.model.name, "gemini-3-flash-preview");
        assert_eq!(selection.requested, None);
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("No model specified; using default.")
        );
        Ok(())
    }
}
