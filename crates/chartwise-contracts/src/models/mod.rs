mod registry;
mod selectors;

pub use registry::{
    ModelRegistry, ModelSpec, CAPABILITY_SEARCH, CAPABILITY_TEXT, CAPABILITY_VISION,
};
pub use selectors::{
    ModelRoutes, ModelSelection, ModelSelector, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL,
};
