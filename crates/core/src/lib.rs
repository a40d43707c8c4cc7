//! Clear AI Core
//!
//! Foundational types for the Clear AI client workspace. This crate has zero
//! dependencies on application-level code (storage, transport, sessions).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `stage` - The four remote agents (`AgentStage`)
//! - `progress` - Progress events, per-request progress state and the pure
//!   phase derivation (`ProgressEvent`, `AgentProgressState`, `Phase`)

pub mod error;
pub mod progress;
pub mod stage;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Stages ─────────────────────────────────────────────────────────────
pub use stage::AgentStage;

// ── Progress Folding ───────────────────────────────────────────────────
pub use progress::{
    derive_phase, percent_from_wire, AgentProgressState, Phase, ProgressEvent, COMPLETE_PERCENT,
};
