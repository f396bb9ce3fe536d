pub mod agent_extract;
pub mod batch_extract;

use goldrec_agents::{config::default_model_for, Settings};

/// Apply CLI provider/model overrides on top of the environment settings.
pub fn apply_overrides(settings: &mut Settings, provider: Option<String>, model: Option<String>) {
    if let Some(provider) = provider {
        settings.model = default_model_for(&provider).to_string();
        settings.provider = provider;
    }
    if let Some(model) = model {
        settings.model = model;
    }
}
