//! Agent Configuration Models
//!
//! Server-side configurations for the analyzer and summarizer agents. The
//! client keeps the selected ids in `AppConfig` and browses the catalog
//! through `AgentConfigCatalog`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which agent a configuration drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Analyzer,
    Summarizer,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Analyzer => "analyzer",
            AgentType::Summarizer => "summarizer",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(default)]
    pub avg_confidence: f64,
    #[serde(default)]
    pub avg_quality_score: f64,
    #[serde(default)]
    pub total_usage: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfigMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<PerformanceMetrics>,
}

/// One stored analyzer or summarizer configuration.
///
/// `config` holds the agent-specific settings (LLM parameters, strategies,
/// prompt templates) and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AgentConfigMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Input for creating a configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentConfigInput {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Partial update; unset fields are left as they are
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentConfigInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Active configurations of one type, in listing order
pub fn configs_by_type(configs: &[AgentConfig], agent_type: AgentType) -> Vec<AgentConfig> {
    configs
        .iter()
        .filter(|c| c.agent_type == agent_type && c.is_active)
        .cloned()
        .collect()
}

/// The configuration flagged as default for a type
pub fn default_config(configs: &[AgentConfig], agent_type: AgentType) -> Option<AgentConfig> {
    configs
        .iter()
        .find(|c| c.agent_type == agent_type && c.is_default)
        .cloned()
}
