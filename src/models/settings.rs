//! Settings Models
//!
//! Client configuration stored in config.json.

use serde::{Deserialize, Serialize};

use crate::models::pipeline::PipelineOptions;

pub const DEFAULT_SUMMARY_FORMAT: &str = "INTELLIGENT";

const SUMMARY_FORMATS: [&str; 4] = ["INTELLIGENT", "TEXT", "MARKDOWN", "JSON"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Environment variable overriding `log_level`
pub const ENV_LOG_LEVEL: &str = "CLEAR_AI_LOG_LEVEL";
/// Environment variable overriding `llm_provider`
pub const ENV_LLM_PROVIDER: &str = "CLEAR_AI_LLM_PROVIDER";

/// Client configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM provider the planner should use; server default when unset
    #[serde(default)]
    pub llm_provider: Option<String>,
    /// Analyzer agent configuration id
    #[serde(default)]
    pub analyzer_config_id: Option<String>,
    /// Summarizer agent configuration id
    #[serde(default)]
    pub summarizer_config_id: Option<String>,
    /// Requested summary format
    #[serde(default = "default_summary_format")]
    pub summary_format: String,
    /// Tracing filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Keep the session list in SQLite
    #[serde(default = "default_true")]
    pub persist_sessions: bool,
    /// Write cache entries through to SQLite
    #[serde(default = "default_true")]
    pub persist_cache: bool,
}

fn default_summary_format() -> String {
    DEFAULT_SUMMARY_FORMAT.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_provider: None,
            analyzer_config_id: None,
            summarizer_config_id: None,
            summary_format: default_summary_format(),
            log_level: default_log_level(),
            persist_sessions: true,
            persist_cache: true,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub llm_provider: Option<String>,
    pub analyzer_config_id: Option<String>,
    pub summarizer_config_id: Option<String>,
    pub summary_format: Option<String>,
    pub log_level: Option<String>,
    pub persist_sessions: Option<bool>,
    pub persist_cache: Option<bool>,
}

impl AppConfig {
    /// Apply a partial update to the configuration.
    ///
    /// An empty string clears an optional selection.
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(provider) = update.llm_provider {
            self.llm_provider = non_empty(provider);
        }
        if let Some(id) = update.analyzer_config_id {
            self.analyzer_config_id = non_empty(id);
        }
        if let Some(id) = update.summarizer_config_id {
            self.summarizer_config_id = non_empty(id);
        }
        if let Some(format) = update.summary_format {
            self.summary_format = format;
        }
        if let Some(level) = update.log_level {
            self.log_level = level;
        }
        if let Some(persist) = update.persist_sessions {
            self.persist_sessions = persist;
        }
        if let Some(persist) = update.persist_cache {
            self.persist_cache = persist;
        }
    }

    /// Apply `CLEAR_AI_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(non_empty) {
            self.log_level = level;
        }
        if let Some(provider) = lookup(ENV_LLM_PROVIDER).and_then(non_empty) {
            self.llm_provider = Some(provider);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !SUMMARY_FORMATS.contains(&self.summary_format.as_str()) {
            return Err(format!(
                "Invalid summary_format: {}. Must be one of {}",
                self.summary_format,
                SUMMARY_FORMATS.join(", ")
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(format!("Invalid log_level: {}", self.log_level));
        }

        Ok(())
    }

    /// Stage options handed to the pipeline coordinator
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            llm_provider: self.llm_provider.clone(),
            analyzer_config_id: self.analyzer_config_id.clone(),
            summarizer_config_id: self.summarizer_config_id.clone(),
            summary_format: Some(self.summary_format.clone()),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
