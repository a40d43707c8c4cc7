//! Clear AI Client
//!
//! Client-side request-pipeline orchestrator for the Clear AI multi-agent
//! query service. It includes:
//! - The four-stage pipeline coordinator (plan, execute, analyze, summarize)
//! - Progress aggregation over the per-agent progress channels
//! - Multi-session conversation state with SQLite persistence
//! - A per-category TTL cache for remote results and cached read paths
//! - The remote boundary traits and a GraphQL operation layer
//!
//! Nothing here renders UI or owns a network transport; the embedding
//! application supplies a [`services::remote::GraphqlTransport`] (or its own
//! service implementations) and reads state from [`AppState`].

pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use clear_ai_core::{AgentProgressState, AgentStage, Phase, ProgressEvent};
pub use models::settings::{AppConfig, SettingsUpdate};
pub use state::{AppState, RemoteServices};
pub use utils::error::{AppError, AppResult};
