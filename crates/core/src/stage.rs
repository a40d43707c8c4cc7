//! Agent Stages
//!
//! The four remote agents that make up one pipeline run, in execution order.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One of the four remote agents (and their progress channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStage {
    /// Turns a query into a step plan
    Planner,
    /// Runs the plan's tool calls
    Executor,
    /// Evaluates the tool results
    Analyzer,
    /// Produces the user-facing answer
    Summarizer,
}

impl AgentStage {
    /// All stages in pipeline order.
    pub const ALL: [AgentStage; 4] = [
        AgentStage::Planner,
        AgentStage::Executor,
        AgentStage::Analyzer,
        AgentStage::Summarizer,
    ];

    /// Lowercase identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStage::Planner => "planner",
            AgentStage::Executor => "executor",
            AgentStage::Analyzer => "analyzer",
            AgentStage::Summarizer => "summarizer",
        }
    }

    /// Name of the progress subscription field for this stage.
    pub fn channel(&self) -> &'static str {
        match self {
            AgentStage::Planner => "plannerProgress",
            AgentStage::Executor => "executorProgress",
            AgentStage::Analyzer => "analyzerProgress",
            AgentStage::Summarizer => "summarizerProgress",
        }
    }

    /// Parse a stage from its identifier (case-insensitive)
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "planner" => Ok(AgentStage::Planner),
            "executor" => Ok(AgentStage::Executor),
            "analyzer" => Ok(AgentStage::Analyzer),
            "summarizer" => Ok(AgentStage::Summarizer),
            other => Err(CoreError::parse(format!("unknown stage: {}", other))),
        }
    }
}

impl std::fmt::Display for AgentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
