//! Remote Service Traits
//!
//! The seams between the client core and the remote multi-agent service.
//! Implementations own the wire protocol; the core only sees typed results.

use async_trait::async_trait;

use clear_ai_core::AgentStage;

use super::types::{GraphqlRequest, GraphqlResponse, GraphqlStream, ProgressStream, RemoteError};
use crate::models::{
    AgentConfig, AgentType, AnalysisResult, CreateAgentConfigInput, ExecutionResults,
    PipelineOptions, PlanResult, Statistics, StatisticsKind, SummaryResult, ToolInfo,
    UpdateAgentConfigInput,
};

/// The four pipeline stages plus cancellation.
#[async_trait]
pub trait RemoteAgentService: Send + Sync {
    /// Plan a query. The returned plan carries the request id for the run.
    async fn create_plan(
        &self,
        query: &str,
        options: &PipelineOptions,
    ) -> Result<PlanResult, RemoteError>;

    async fn execute_tools(&self, request_id: &str) -> Result<ExecutionResults, RemoteError>;

    async fn analyze_results(
        &self,
        request_id: &str,
        analyzer_config_id: Option<&str>,
    ) -> Result<AnalysisResult, RemoteError>;

    async fn summarize(
        &self,
        request_id: &str,
        format: Option<&str>,
        summarizer_config_id: Option<&str>,
    ) -> Result<SummaryResult, RemoteError>;

    /// Ask the server to stop a request. The pipeline never calls this.
    async fn cancel(&self, request_id: &str) -> Result<bool, RemoteError>;
}

/// Per-stage progress subscriptions.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn subscribe(
        &self,
        stage: AgentStage,
        request_id: &str,
    ) -> Result<ProgressStream, RemoteError>;
}

/// Read-side lookups used by the cached read paths.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn get_plan(&self, request_id: &str) -> Result<PlanResult, RemoteError>;

    async fn get_execution(&self, execution_id: &str) -> Result<ExecutionResults, RemoteError>;

    async fn list_tools(&self) -> Result<Vec<ToolInfo>, RemoteError>;

    async fn get_statistics(&self, kind: StatisticsKind) -> Result<Statistics, RemoteError>;
}

/// Server-side analyzer and summarizer configurations.
#[async_trait]
pub trait AgentConfigService: Send + Sync {
    /// List configurations, optionally narrowed by type and active flag
    async fn list_agent_configs(
        &self,
        agent_type: Option<AgentType>,
        is_active: Option<bool>,
    ) -> Result<Vec<AgentConfig>, RemoteError>;

    async fn create_agent_config(
        &self,
        input: &CreateAgentConfigInput,
    ) -> Result<AgentConfig, RemoteError>;

    async fn update_agent_config(
        &self,
        id: &str,
        input: &UpdateAgentConfigInput,
    ) -> Result<AgentConfig, RemoteError>;

    /// Returns whether the server removed anything
    async fn delete_agent_config(&self, id: &str) -> Result<bool, RemoteError>;

    /// Make `id` the default for its type
    async fn set_default_config(&self, id: &str) -> Result<AgentConfig, RemoteError>;

    async fn clone_agent_config(&self, id: &str, name: &str) -> Result<AgentConfig, RemoteError>;
}

/// Moves GraphQL operations over the wire (HTTP for queries and mutations,
/// WebSocket for subscriptions).
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: GraphqlRequest) -> Result<GraphqlResponse, RemoteError>;

    async fn subscribe(&self, request: GraphqlRequest) -> Result<GraphqlStream, RemoteError>;
}
