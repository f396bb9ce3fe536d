//! Pipeline settings.
//!
//! A single immutable value constructed once at startup from the
//! environment and passed by shared reference. Recognised keys are exactly
//! the ones documented here; anything else in the environment is ignored.

use std::env;
use std::path::PathBuf;

/// Default models per provider, used when no model is configured.
pub fn default_model_for(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "claude-sonnet-4@20250514",
        "google" => "gemini-2.5-flash",
        _ => "",
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Primary provider: "google" or "anthropic".
    pub provider: String,
    pub model: String,

    /// Cascade: retry with a quality model when the cheap one misses too
    /// many attributes.
    pub cascade_enabled: bool,
    pub cascade_provider: String,
    pub cascade_model: String,
    /// Fallback fires when missing attributes exceed this count.
    pub cascade_threshold: usize,

    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_file_size_mb: u64,
    pub max_concurrent: usize,

    /// Directory of prompt templates; embedded defaults when unset.
    pub prompt_dir: Option<PathBuf>,

    pub gemini_api_key: String,
    pub anthropic_api_key: String,

    /// Claude via Vertex AI: set the project to route through Google Cloud.
    pub vertex_project_id: String,
    pub vertex_location: String,
    pub vertex_credentials_path: String,
    pub vertex_access_token: String,

    pub database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: "google".into(),
            model: default_model_for("google").into(),
            cascade_enabled: true,
            cascade_provider: "anthropic".into(),
            cascade_model: default_model_for("anthropic").into(),
            cascade_threshold: 10,
            max_retries: 2,
            retry_delay_ms: 1000,
            max_file_size_mb: 20,
            max_concurrent: 4,
            prompt_dir: None,
            gemini_api_key: String::new(),
            anthropic_api_key: String::new(),
            vertex_project_id: String::new(),
            vertex_location: "europe-west1".into(),
            vertex_credentials_path: String::new(),
            vertex_access_token: String::new(),
            database_url: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn bool_var(key: &str, default: bool) -> bool {
    match var(key).as_deref() {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        _ => default,
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        let provider = var("GOLDREC_PROVIDER").unwrap_or(defaults.provider);
        let model = var("GOLDREC_MODEL").unwrap_or_else(|| default_model_for(&provider).into());
        let cascade_provider =
            var("GOLDREC_CASCADE_PROVIDER").unwrap_or(defaults.cascade_provider);
        let cascade_model = var("GOLDREC_CASCADE_MODEL")
            .unwrap_or_else(|| default_model_for(&cascade_provider).into());

        Self {
            model,
            cascade_enabled: bool_var("GOLDREC_CASCADE_ENABLED", defaults.cascade_enabled),
            cascade_model,
            cascade_threshold: parse_var("GOLDREC_CASCADE_THRESHOLD", defaults.cascade_threshold),
            max_retries: parse_var("GOLDREC_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: parse_var("GOLDREC_RETRY_DELAY_MS", defaults.retry_delay_ms),
            max_file_size_mb: parse_var("GOLDREC_MAX_FILE_SIZE_MB", defaults.max_file_size_mb),
            max_concurrent: parse_var("GOLDREC_MAX_CONCURRENT", defaults.max_concurrent),
            prompt_dir: var("GOLDREC_PROMPT_DIR").map(PathBuf::from),
            gemini_api_key: var("GEMINI_API_KEY").unwrap_or_default(),
            anthropic_api_key: var("ANTHROPIC_API_KEY").unwrap_or_default(),
            vertex_project_id: var("VERTEX_PROJECT_ID").unwrap_or_default(),
            vertex_location: var("VERTEX_LOCATION").unwrap_or(defaults.vertex_location),
            vertex_credentials_path: var("VERTEX_CREDENTIALS_PATH").unwrap_or_default(),
            vertex_access_token: var("VERTEX_ACCESS_TOKEN").unwrap_or_default(),
            database_url: var("GOLDREC_DATABASE_URL"),
            provider,
            cascade_provider,
        }
    }

    /// Whether a distinct cascade target is actually configured.
    pub fn cascade_differs(&self) -> bool {
        self.cascade_provider != self.provider || self.cascade_model != self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.provider, "google");
        assert_eq!(s.model, "gemini-2.5-flash");
        assert!(s.cascade_enabled);
        assert_eq!(s.cascade_threshold, 10);
        assert_eq!(s.max_file_size_mb, 20);
        assert_eq!(s.max_concurrent, 4);
        assert!(s.cascade_differs());
    }

    #[test]
    fn same_provider_and_model_disables_cascade_target() {
        let mut s = Settings::default();
        s.cascade_provider = s.provider.clone();
        s.cascade_model = s.model.clone();
        assert!(!s.cascade_differs());
    }
}
