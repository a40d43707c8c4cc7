//! Pipeline Models
//!
//! Payloads returned by the four remote stages and the per-request bundle
//! that collects them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a plan produced by the planner stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Tool name to invoke
    pub tool: String,
    /// Tool parameters, passed through untouched
    #[serde(default)]
    pub params: Value,
    /// Indices of steps that must finish first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<u32>>,
    /// Whether the step may run alongside its siblings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    pub query: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_ms: Option<f64>,
}

/// Result of the planner stage. Mints the request id shared by the later stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub request_id: String,
    pub plan: Plan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PlanMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PlanResult {
    pub fn step_count(&self) -> usize {
        self.plan.steps.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMetadata {
    /// Execution time in milliseconds, possibly fractional
    pub execution_time: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

/// Outcome of one executed tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ToolResultMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    pub total_duration_ms: f64,
    pub successful_steps: u32,
    pub failed_steps: u32,
    pub timestamp: String,
}

/// Result of the executor stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResults {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub results: Vec<ToolResult>,
    pub metadata: ExecutionMetadata,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_step_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_frequency: Option<f64>,
    #[serde(default)]
    pub error_patterns: Vec<String>,
    #[serde(default)]
    pub step_success_rates: BTreeMap<String, f64>,
}

/// Result of the analyzer stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub request_id: String,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub evaluation_metrics: EvaluationMetrics,
    #[serde(default)]
    pub success_indicators: Vec<String>,
    #[serde(default)]
    pub failure_patterns: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub key_results: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Result of the summarizer stage. `content` is what the user reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub request_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredSummary>,
}

/// Per-run selections passed through to the remote stages
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer_config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer_config_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_format: Option<String>,
}

/// Everything one pipeline run produced for a request.
///
/// Stages fill in left to right, so a later field is never present without
/// every earlier one. The fields are private to keep it that way: a bundle is
/// either empty or complete. Deserialization rejects a bundle with a gap.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredBundle")]
pub struct StageResultBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan: Option<PlanResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution: Option<ExecutionResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryResult>,
}

/// Wire shape of a bundle before the ordering check
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBundle {
    #[serde(default)]
    plan: Option<PlanResult>,
    #[serde(default)]
    execution: Option<ExecutionResults>,
    #[serde(default)]
    analysis: Option<AnalysisResult>,
    #[serde(default)]
    summary: Option<SummaryResult>,
}

impl TryFrom<StoredBundle> for StageResultBundle {
    type Error = String;

    fn try_from(stored: StoredBundle) -> Result<Self, Self::Error> {
        let bundle = Self {
            plan: stored.plan,
            execution: stored.execution,
            analysis: stored.analysis,
            summary: stored.summary,
        };
        if bundle.is_ordered() {
            Ok(bundle)
        } else {
            Err("stage results present without the stages before them".to_string())
        }
    }
}

impl StageResultBundle {
    /// Bundle for a run that finished every stage
    pub fn complete(
        plan: PlanResult,
        execution: ExecutionResults,
        analysis: AnalysisResult,
        summary: SummaryResult,
    ) -> Self {
        Self {
            plan: Some(plan),
            execution: Some(execution),
            analysis: Some(analysis),
            summary: Some(summary),
        }
    }

    pub fn plan(&self) -> Option<&PlanResult> {
        self.plan.as_ref()
    }

    pub fn execution(&self) -> Option<&ExecutionResults> {
        self.execution.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn summary(&self) -> Option<&SummaryResult> {
        self.summary.as_ref()
    }

    /// Request id of the run, taken from the plan
    pub fn request_id(&self) -> Option<&str> {
        self.plan.as_ref().map(|p| p.request_id.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some() && self.is_ordered()
    }

    /// True when no field is present without all the fields before it
    pub fn is_ordered(&self) -> bool {
        let present = [
            self.plan.is_some(),
            self.execution.is_some(),
            self.analysis.is_some(),
            self.summary.is_some(),
        ];
        present.windows(2).all(|pair| pair[0] || !pair[1])
    }
}
