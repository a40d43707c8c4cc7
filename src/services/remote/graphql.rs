//! GraphQL Operation Layer
//!
//! Implements the remote service traits on top of any [`GraphqlTransport`].
//! Owns the operation documents, variable building and response decoding.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use clear_ai_core::{percent_from_wire, AgentStage, ProgressEvent};

use super::service::{
    AgentConfigService, CatalogService, GraphqlTransport, ProgressSource, RemoteAgentService,
};
use super::types::{GraphqlRequest, ProgressStream, RemoteError};
use crate::models::{
    AgentConfig, AgentType, AnalysisResult, CreateAgentConfigInput, ExecutionResults,
    PipelineOptions, PlanResult, Statistics, StatisticsKind, SummaryResult, ToolInfo,
    UpdateAgentConfigInput,
};

// ============================================================================
// Operation Documents
// ============================================================================

const PLAN_FIELDS: &str = r#"
      requestId
      plan { steps { tool params dependsOn parallel } }
      metadata { query timestamp estimatedDurationMs }
      status"#;

const EXECUTION_FIELDS: &str = r#"
      requestId
      executionId
      results {
        success
        tool
        data
        error { code message details }
        metadata { executionTime timestamp retries }
      }
      metadata { totalDurationMs successfulSteps failedSteps timestamp }"#;

const AGENT_CONFIG_FIELDS: &str = r#"
    id
    name
    type
    version
    isDefault
    isActive
    description
    config
    metadata { performanceMetrics { avgConfidence avgQualityScore totalUsage lastUsed successRate } }
    createdAt
    updatedAt"#;

pub const PLAN_QUERY: &str = "mutation PlanQuery($query: String!, $context: JSON) {
  planQuery(query: $query, context: $context) {__PLAN__
  }
}";

pub const EXECUTE_TOOLS: &str = "mutation ExecuteTools($requestId: ID!) {
  executeTools(requestId: $requestId) {__EXECUTION__
  }
}";

pub const ANALYZE_RESULTS: &str = r#"mutation AnalyzeResults($requestId: ID!, $analyzerConfigId: ID) {
  analyzeResults(requestId: $requestId, analyzerConfigId: $analyzerConfigId) {
    requestId
    feedback
    evaluationMetrics {
      successRate
      efficiencyScore
      averageStepTimeMs
      retryFrequency
      errorPatterns
      stepSuccessRates
    }
    successIndicators
    failurePatterns
    recommendations
    improvementNotes
  }
}"#;

pub const SUMMARIZE_RESPONSE: &str = r#"mutation SummarizeResponse($requestId: ID!, $format: String, $summarizerConfigId: ID) {
  summarizeResponse(requestId: $requestId, format: $format, summarizerConfigId: $summarizerConfigId) {
    requestId
    content
    format
    structuredData { success answer keyResults recommendations errors }
  }
}"#;

pub const CANCEL_QUERY: &str = "mutation CancelQuery($requestId: ID!) {
  cancelQuery(requestId: $requestId)
}";

pub const GET_PLAN: &str = "query GetPlan($requestId: ID!) {
  getPlan(requestId: $requestId) {__PLAN__
  }
}";

pub const GET_EXECUTION: &str = "query GetExecution($executionId: ID!) {
  getExecution(executionId: $executionId) {__EXECUTION__
  }
}";

pub const LIST_TOOLS: &str = "query ListTools {
  listTools { name description parameters }
}";

pub const GET_METRICS: &str = "query GetMetrics {
  getMetrics { totalRequests successfulRequests failedRequests avgDuration uptime }
}";

pub const GET_PLAN_STATISTICS: &str = "query GetPlanStatistics {
  getPlanStatistics
}";

pub const GET_EXECUTION_STATISTICS: &str = "query GetExecutionStatistics {
  getExecutionStatistics
}";

pub const LIST_AGENT_CONFIGS: &str = "query ListAgentConfigs($type: AgentType, $isActive: Boolean) {
  listAgentConfigs(type: $type, isActive: $isActive) {__AGENT_CONFIG__
  }
}";

pub const CREATE_AGENT_CONFIG: &str = "mutation CreateAgentConfig($input: CreateAgentConfigInput!) {
  createAgentConfig(input: $input) {__AGENT_CONFIG__
  }
}";

pub const UPDATE_AGENT_CONFIG: &str = "mutation UpdateAgentConfig($id: ID!, $input: UpdateAgentConfigInput!) {
  updateAgentConfig(id: $id, input: $input) {__AGENT_CONFIG__
  }
}";

pub const DELETE_AGENT_CONFIG: &str = "mutation DeleteAgentConfig($id: ID!) {
  deleteAgentConfig(id: $id)
}";

pub const SET_DEFAULT_CONFIG: &str = "mutation SetDefaultConfig($id: ID!) {
  setDefaultConfig(id: $id) {__AGENT_CONFIG__
  }
}";

pub const CLONE_AGENT_CONFIG: &str = "mutation CloneAgentConfig($id: ID!, $name: String!) {
  cloneAgentConfig(id: $id, name: $name) {__AGENT_CONFIG__
  }
}";

fn with_fields(document: &str) -> String {
    document
        .replace("__PLAN__", PLAN_FIELDS)
        .replace("__EXECUTION__", EXECUTION_FIELDS)
        .replace("__AGENT_CONFIG__", AGENT_CONFIG_FIELDS)
}

/// Subscription document for one progress channel
pub fn progress_subscription(stage: AgentStage) -> (String, String) {
    let channel = stage.channel();
    let step = if stage == AgentStage::Executor {
        " currentStep"
    } else {
        ""
    };
    let mut operation = channel.to_string();
    operation[..1].make_ascii_uppercase();
    let document = format!(
        "subscription {operation}($requestId: ID!) {{\n  {channel}(requestId: $requestId) {{ requestId phase progress message{step} timestamp }}\n}}"
    );
    (operation, document)
}

fn statistics_operation(kind: StatisticsKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        StatisticsKind::Plans => ("GetPlanStatistics", "getPlanStatistics", GET_PLAN_STATISTICS),
        StatisticsKind::Executions => (
            "GetExecutionStatistics",
            "getExecutionStatistics",
            GET_EXECUTION_STATISTICS,
        ),
        StatisticsKind::Metrics => ("GetMetrics", "getMetrics", GET_METRICS),
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn decode<T: DeserializeOwned>(operation: &str, value: Value) -> Result<T, RemoteError> {
    serde_json::from_value(value).map_err(|e| RemoteError::decode(operation, e.to_string()))
}

fn encode<T: serde::Serialize>(operation: &str, input: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(input)
        .map_err(|e| RemoteError::decode(operation, format!("unencodable input: {}", e)))
}

/// Progress payload as the server sends it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProgress {
    request_id: String,
    progress: f64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    current_step: Option<u32>,
}

fn decode_progress(stage: AgentStage, value: Value) -> Result<ProgressEvent, RemoteError> {
    let wire: WireProgress = decode(stage.channel(), value)?;
    let percent = percent_from_wire(wire.progress)
        .map_err(|e| RemoteError::decode(stage.channel(), e.to_string()))?;
    let mut event = ProgressEvent::new(wire.request_id, stage, percent, wire.message, wire.timestamp);
    event.current_step = wire.current_step;
    Ok(event)
}

// ============================================================================
// Service
// ============================================================================

/// Remote agent service speaking GraphQL through a pluggable transport.
pub struct GraphqlAgentService<T: GraphqlTransport> {
    transport: Arc<T>,
}

impl<T: GraphqlTransport> Clone for GraphqlAgentService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: GraphqlTransport> GraphqlAgentService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        Self { transport }
    }

    async fn call<R: DeserializeOwned>(
        &self,
        request: GraphqlRequest,
        field: &str,
    ) -> Result<R, RemoteError> {
        let operation = request.operation_name.clone();
        tracing::debug!("[Remote] {}", operation);
        let value = self.transport.execute(request).await?.into_field(field)?;
        decode(&operation, value)
    }
}

#[async_trait]
impl<T: GraphqlTransport + 'static> RemoteAgentService for GraphqlAgentService<T> {
    async fn create_plan(
        &self,
        query: &str,
        options: &PipelineOptions,
    ) -> Result<PlanResult, RemoteError> {
        let mut request = GraphqlRequest::new("PlanQuery", with_fields(PLAN_QUERY)).var("query", query);
        if let Some(provider) = &options.llm_provider {
            request = request.var("context", serde_json::json!({ "llmProvider": provider }));
        }
        self.call(request, "planQuery").await
    }

    async fn execute_tools(&self, request_id: &str) -> Result<ExecutionResults, RemoteError> {
        let request =
            GraphqlRequest::new("ExecuteTools", with_fields(EXECUTE_TOOLS)).var("requestId", request_id);
        self.call(request, "executeTools").await
    }

    async fn analyze_results(
        &self,
        request_id: &str,
        analyzer_config_id: Option<&str>,
    ) -> Result<AnalysisResult, RemoteError> {
        let request = GraphqlRequest::new("AnalyzeResults", ANALYZE_RESULTS)
            .var("requestId", request_id)
            .opt_var("analyzerConfigId", analyzer_config_id);
        self.call(request, "analyzeResults").await
    }

    async fn summarize(
        &self,
        request_id: &str,
        format: Option<&str>,
        summarizer_config_id: Option<&str>,
    ) -> Result<SummaryResult, RemoteError> {
        let request = GraphqlRequest::new("SummarizeResponse", SUMMARIZE_RESPONSE)
            .var("requestId", request_id)
            .opt_var("format", format)
            .opt_var("summarizerConfigId", summarizer_config_id);
        self.call(request, "summarizeResponse").await
    }

    async fn cancel(&self, request_id: &str) -> Result<bool, RemoteError> {
        let request = GraphqlRequest::new("CancelQuery", CANCEL_QUERY).var("requestId", request_id);
        self.call(request, "cancelQuery").await
    }
}

#[async_trait]
impl<T: GraphqlTransport + 'static> ProgressSource for GraphqlAgentService<T> {
    async fn subscribe(
        &self,
        stage: AgentStage,
        request_id: &str,
    ) -> Result<ProgressStream, RemoteError> {
        let (operation, document) = progress_subscription(stage);
        let request = GraphqlRequest::new(operation, document).var("requestId", request_id);
        let raw = self.transport.subscribe(request).await?;

        let events = raw.map(move |item| {
            item.and_then(|response| response.into_field(stage.channel()))
                .and_then(|value| decode_progress(stage, value))
        });
        Ok(Box::pin(events))
    }
}

#[async_trait]
impl<T: GraphqlTransport + 'static> CatalogService for GraphqlAgentService<T> {
    async fn get_plan(&self, request_id: &str) -> Result<PlanResult, RemoteError> {
        let request = GraphqlRequest::new("GetPlan", with_fields(GET_PLAN)).var("requestId", request_id);
        self.call(request, "getPlan").await
    }

    async fn get_execution(&self, execution_id: &str) -> Result<ExecutionResults, RemoteError> {
        let request = GraphqlRequest::new("GetExecution", with_fields(GET_EXECUTION))
            .var("executionId", execution_id);
        self.call(request, "getExecution").await
    }

    async fn list_tools(&self) -> Result<Vec<ToolInfo>, RemoteError> {
        self.call(GraphqlRequest::new("ListTools", LIST_TOOLS), "listTools")
            .await
    }

    async fn get_statistics(&self, kind: StatisticsKind) -> Result<Statistics, RemoteError> {
        let (operation, field, document) = statistics_operation(kind);
        let data: Value = self.call(GraphqlRequest::new(operation, document), field).await?;
        Ok(Statistics { kind, data })
    }
}

#[async_trait]
impl<T: GraphqlTransport + 'static> AgentConfigService for GraphqlAgentService<T> {
    async fn list_agent_configs(
        &self,
        agent_type: Option<AgentType>,
        is_active: Option<bool>,
    ) -> Result<Vec<AgentConfig>, RemoteError> {
        let mut request = GraphqlRequest::new("ListAgentConfigs", with_fields(LIST_AGENT_CONFIGS))
            .opt_var("type", agent_type.as_ref().map(AgentType::as_str));
        if let Some(active) = is_active {
            request = request.var("isActive", active);
        }
        self.call(request, "listAgentConfigs").await
    }

    async fn create_agent_config(
        &self,
        input: &CreateAgentConfigInput,
    ) -> Result<AgentConfig, RemoteError> {
        let input = encode("CreateAgentConfig", input)?;
        let request = GraphqlRequest::new("CreateAgentConfig", with_fields(CREATE_AGENT_CONFIG))
            .var("input", input);
        self.call(request, "createAgentConfig").await
    }

    async fn update_agent_config(
        &self,
        id: &str,
        input: &UpdateAgentConfigInput,
    ) -> Result<AgentConfig, RemoteError> {
        let input = encode("UpdateAgentConfig", input)?;
        let request = GraphqlRequest::new("UpdateAgentConfig", with_fields(UPDATE_AGENT_CONFIG))
            .var("id", id)
            .var("input", input);
        self.call(request, "updateAgentConfig").await
    }

    async fn delete_agent_config(&self, id: &str) -> Result<bool, RemoteError> {
        let request = GraphqlRequest::new("DeleteAgentConfig", DELETE_AGENT_CONFIG).var("id", id);
        self.call(request, "deleteAgentConfig").await
    }

    async fn set_default_config(&self, id: &str) -> Result<AgentConfig, RemoteError> {
        let request =
            GraphqlRequest::new("SetDefaultConfig", with_fields(SET_DEFAULT_CONFIG)).var("id", id);
        self.call(request, "setDefaultConfig").await
    }

    async fn clone_agent_config(&self, id: &str, name: &str) -> Result<AgentConfig, RemoteError> {
        let request = GraphqlRequest::new("CloneAgentConfig", with_fields(CLONE_AGENT_CONFIG))
            .var("id", id)
            .var("name", name);
        self.call(request, "cloneAgentConfig").await
    }
}
