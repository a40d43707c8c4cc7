//! Progress Tracking
//!
//! Live per-request progress built from the agent progress channels. The
//! pure fold lives in `clear_ai_core::progress`; this module owns the
//! subscriptions and the shared state.

pub mod aggregator;

pub use aggregator::ProgressAggregator;
pub use clear_ai_core::{AgentProgressState, Phase, ProgressEvent};
