//! Progress Folding
//!
//! Per-request progress state built from the four agent progress channels,
//! and the pure phase derivation over it.
//!
//! Events for different stages arrive interleaved in any order. The fold keeps
//! the last event per stage (last write wins) and the phase is derived only
//! from completion thresholds, never from arrival order. A stage that reports
//! less than 100 after having reported 100 regresses the derived phase; that
//! is reproduced as-is.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::stage::AgentStage;

/// Percent value that marks a stage as finished.
pub const COMPLETE_PERCENT: u8 = 100;

/// One progress update from a single agent channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Request the update belongs to
    pub request_id: String,
    /// Channel the update arrived on
    pub stage: AgentStage,
    /// 0..=100
    pub percent: u8,
    /// Human-readable status line
    pub message: String,
    /// Server timestamp (ISO 8601)
    pub timestamp: String,
    /// Step currently running (executor channel only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
}

impl ProgressEvent {
    /// Create an event, clamping `percent` into 0..=100.
    pub fn new(
        request_id: impl Into<String>,
        stage: AgentStage,
        percent: u8,
        message: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            stage,
            percent: percent.min(COMPLETE_PERCENT),
            message: message.into(),
            timestamp: timestamp.into(),
            current_step: None,
        }
    }

    /// Whether this update reports the stage as finished.
    pub fn is_complete(&self) -> bool {
        self.percent == COMPLETE_PERCENT
    }
}

/// Convert a wire progress number (possibly fractional) into a percent.
pub fn percent_from_wire(value: f64) -> CoreResult<u8> {
    if !value.is_finite() {
        return Err(CoreError::validation(format!("progress is not a number: {}", value)));
    }
    Ok(value.round().clamp(0.0, COMPLETE_PERCENT as f64) as u8)
}

/// Last-known event per stage for one request. `None` = not yet seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProgressState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner: Option<ProgressEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<ProgressEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<ProgressEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer: Option<ProgressEvent>,
}

impl AgentProgressState {
    /// Fold one event in. Overwrites whatever the stage held before.
    pub fn apply(&mut self, event: ProgressEvent) {
        let stage = event.stage;
        *self.slot_mut(stage) = Some(event);
    }

    /// Last event seen for a stage.
    pub fn get(&self, stage: AgentStage) -> Option<&ProgressEvent> {
        match stage {
            AgentStage::Planner => self.planner.as_ref(),
            AgentStage::Executor => self.executor.as_ref(),
            AgentStage::Analyzer => self.analyzer.as_ref(),
            AgentStage::Summarizer => self.summarizer.as_ref(),
        }
    }

    fn slot_mut(&mut self, stage: AgentStage) -> &mut Option<ProgressEvent> {
        match stage {
            AgentStage::Planner => &mut self.planner,
            AgentStage::Executor => &mut self.executor,
            AgentStage::Analyzer => &mut self.analyzer,
            AgentStage::Summarizer => &mut self.summarizer,
        }
    }

    /// True when no channel has reported anything yet.
    pub fn is_empty(&self) -> bool {
        AgentStage::ALL.iter().all(|s| self.get(*s).is_none())
    }

    fn stage_complete(&self, stage: AgentStage) -> bool {
        self.get(stage).map_or(false, ProgressEvent::is_complete)
    }

    /// Derive the overall phase. See [`derive_phase`].
    pub fn phase(&self) -> Phase {
        derive_phase(self)
    }
}

/// Overall pipeline phase shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Starting,
    Planning,
    Executing,
    Analyzing,
    Summarizing,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Planning => "planning",
            Phase::Executing => "executing",
            Phase::Analyzing => "analyzing",
            Phase::Summarizing => "summarizing",
            Phase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the phase from the four stored values, top-down, first match wins:
///
/// | condition                 | phase         |
/// |---------------------------|---------------|
/// | summarizer at 100         | `complete`    |
/// | analyzer at 100           | `summarizing` |
/// | executor at 100           | `analyzing`   |
/// | planner at 100            | `executing`   |
/// | planner seen              | `planning`    |
/// | otherwise                 | `starting`    |
pub fn derive_phase(state: &AgentProgressState) -> Phase {
    if state.stage_complete(AgentStage::Summarizer) {
        Phase::Complete
    } else if state.stage_complete(AgentStage::Analyzer) {
        Phase::Summarizing
    } else if state.stage_complete(AgentStage::Executor) {
        Phase::Analyzing
    } else if state.stage_complete(AgentStage::Planner) {
        Phase::Executing
    } else if state.planner.is_some() {
        Phase::Planning
    } else {
        Phase::Starting
    }
}
