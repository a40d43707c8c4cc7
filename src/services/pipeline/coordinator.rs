//! Pipeline Coordinator
//!
//! Drives one user query through plan → execute → analyze → summarize and
//! records the outcome in the session that was active when the run began.
//!
//! Stages run strictly in order; the first failure aborts the run. There is
//! no retry, no timeout and no cancellation.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use clear_ai_core::AgentStage;

use crate::models::{Message, PipelineOptions, SessionStatus, StageResultBundle};
use crate::services::remote::{RemoteAgentService, RemoteError};
use crate::services::session::SessionManager;
use crate::utils::clock::{system_clock, Clock};

/// Assistant reply appended when a run fails. Details go to the log only.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a run did not complete.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Planning failed: {0}")]
    PlanningFailed(#[source] RemoteError),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(#[source] RemoteError),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(#[source] RemoteError),

    #[error("Summarization failed: {0}")]
    SummarizationFailed(#[source] RemoteError),
}

impl PipelineError {
    /// Stage that failed, if the run got that far
    pub fn stage(&self) -> Option<AgentStage> {
        match self {
            PipelineError::NoActiveSession => None,
            PipelineError::PlanningFailed(_) => Some(AgentStage::Planner),
            PipelineError::ExecutionFailed(_) => Some(AgentStage::Executor),
            PipelineError::AnalysisFailed(_) => Some(AgentStage::Analyzer),
            PipelineError::SummarizationFailed(_) => Some(AgentStage::Summarizer),
        }
    }

    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            PipelineError::NoActiveSession => None,
            PipelineError::PlanningFailed(e)
            | PipelineError::ExecutionFailed(e)
            | PipelineError::AnalysisFailed(e)
            | PipelineError::SummarizationFailed(e) => Some(e),
        }
    }
}

/// Run lifecycle notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    #[serde(rename_all = "camelCase")]
    StageStarted {
        session_id: String,
        stage: AgentStage,
    },
    /// The planner minted the request id for this run
    #[serde(rename_all = "camelCase")]
    RequestCreated {
        session_id: String,
        request_id: String,
    },
    #[serde(rename_all = "camelCase")]
    StageCompleted {
        session_id: String,
        request_id: String,
        stage: AgentStage,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        session_id: String,
        request_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        session_id: String,
        stage: Option<AgentStage>,
        error: String,
    },
}

pub struct PipelineCoordinator {
    agents: Arc<dyn RemoteAgentService>,
    sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
    options: RwLock<PipelineOptions>,
    events: broadcast::Sender<PipelineEvent>,
}

impl PipelineCoordinator {
    pub fn new(agents: Arc<dyn RemoteAgentService>, sessions: Arc<SessionManager>) -> Self {
        Self::with_clock(agents, sessions, system_clock())
    }

    pub fn with_clock(
        agents: Arc<dyn RemoteAgentService>,
        sessions: Arc<SessionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            agents,
            sessions,
            clock,
            options: RwLock::new(PipelineOptions::default()),
            events,
        }
    }

    /// Start with `options` instead of the defaults
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = RwLock::new(options);
        self
    }

    /// Replace the stage options used by subsequent runs
    pub async fn set_options(&self, options: PipelineOptions) {
        *self.options.write().await = options;
    }

    pub async fn options(&self) -> PipelineOptions {
        self.options.read().await.clone()
    }

    /// Receive run lifecycle events. Slow receivers may miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Run `query` through the four stages.
    ///
    /// The user's query is appended to the active session first. On success
    /// the summary is appended as an assistant message carrying the request
    /// id and the full bundle, and the session is marked completed. On
    /// failure a generic assistant message is appended and the session is
    /// marked as errored; the error is also returned.
    pub async fn run(&self, query: &str) -> Result<StageResultBundle, PipelineError> {
        let Some(session_id) = self.sessions.active_session_id().await else {
            tracing::warn!("[Pipeline] query submitted with no active session");
            return Err(PipelineError::NoActiveSession);
        };

        self.sessions
            .add_message(&session_id, Message::user(query, self.clock.now()))
            .await;

        let options = self.options().await;
        match self.execute_stages(&session_id, query, &options).await {
            Ok(bundle) => {
                let request_id = bundle.request_id().unwrap_or_default().to_string();
                let content = bundle
                    .summary()
                    .map(|s| s.content.clone())
                    .unwrap_or_default();

                let reply = Message::assistant_result(
                    content,
                    request_id.clone(),
                    bundle.clone(),
                    self.clock.now(),
                );
                self.sessions.add_message(&session_id, reply).await;
                self.sessions
                    .set_status(&session_id, SessionStatus::Completed)
                    .await;

                tracing::info!("[Pipeline] request {} completed", request_id);
                self.emit(PipelineEvent::Completed {
                    session_id,
                    request_id,
                });
                Ok(bundle)
            }
            Err(e) => {
                tracing::error!("[Pipeline] run failed: {}", e);
                self.sessions
                    .add_message(
                        &session_id,
                        Message::assistant_error(GENERIC_ERROR_MESSAGE, self.clock.now()),
                    )
                    .await;
                self.sessions
                    .set_status(&session_id, SessionStatus::Error)
                    .await;

                self.emit(PipelineEvent::Failed {
                    session_id,
                    stage: e.stage(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute_stages(
        &self,
        session_id: &str,
        query: &str,
        options: &PipelineOptions,
    ) -> Result<StageResultBundle, PipelineError> {
        self.stage_started(session_id, AgentStage::Planner);
        let plan = self
            .agents
            .create_plan(query, options)
            .await
            .map_err(PipelineError::PlanningFailed)?;
        let request_id = plan.request_id.clone();
        if plan.step_count() == 0 {
            tracing::debug!("[Pipeline] plan for {} has no steps", request_id);
        }
        self.emit(PipelineEvent::RequestCreated {
            session_id: session_id.to_string(),
            request_id: request_id.clone(),
        });
        self.stage_completed(session_id, &request_id, AgentStage::Planner);

        self.stage_started(session_id, AgentStage::Executor);
        let execution = self
            .agents
            .execute_tools(&request_id)
            .await
            .map_err(PipelineError::ExecutionFailed)?;
        self.stage_completed(session_id, &request_id, AgentStage::Executor);

        self.stage_started(session_id, AgentStage::Analyzer);
        let analysis = self
            .agents
            .analyze_results(&request_id, options.analyzer_config_id.as_deref())
            .await
            .map_err(PipelineError::AnalysisFailed)?;
        self.stage_completed(session_id, &request_id, AgentStage::Analyzer);

        self.stage_started(session_id, AgentStage::Summarizer);
        let summary = self
            .agents
            .summarize(
                &request_id,
                options.summary_format.as_deref(),
                options.summarizer_config_id.as_deref(),
            )
            .await
            .map_err(PipelineError::SummarizationFailed)?;
        self.stage_completed(session_id, &request_id, AgentStage::Summarizer);

        Ok(StageResultBundle::complete(plan, execution, analysis, summary))
    }

    fn stage_started(&self, session_id: &str, stage: AgentStage) {
        tracing::debug!("[Pipeline] {} started", stage);
        self.emit(PipelineEvent::StageStarted {
            session_id: session_id.to_string(),
            stage,
        });
    }

    fn stage_completed(&self, session_id: &str, request_id: &str, stage: AgentStage) {
        self.emit(PipelineEvent::StageCompleted {
            session_id: session_id.to_string(),
            request_id: request_id.to_string(),
            stage,
        });
    }

    fn emit(&self, event: PipelineEvent) {
        // send only fails when nobody is listening
        let _ = self.events.send(event);
    }
}
