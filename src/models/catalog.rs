//! Catalog Models
//!
//! Read-side payloads fetched outside the main pipeline: tool listings and
//! service statistics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool the remote executor can run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Which statistics report to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsKind {
    Plans,
    Executions,
    Metrics,
}

impl StatisticsKind {
    pub const ALL: [StatisticsKind; 3] = [
        StatisticsKind::Plans,
        StatisticsKind::Executions,
        StatisticsKind::Metrics,
    ];

    /// Cache key for this report
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticsKind::Plans => "plans",
            StatisticsKind::Executions => "executions",
            StatisticsKind::Metrics => "metrics",
        }
    }
}

impl std::fmt::Display for StatisticsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statistics report. The shape of `data` depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub kind: StatisticsKind,
    pub data: Value,
}
