//! Services
//!
//! Client-side orchestration services. Each one is owned by [`crate::AppState`]
//! and reaches the remote service only through the traits in [`remote`].

pub mod cache;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod session;

pub use cache::{CacheCategory, CachedReads, ResultCache};
pub use pipeline::{PipelineCoordinator, PipelineError, PipelineEvent};
pub use progress::ProgressAggregator;
pub use remote::{CatalogService, GraphqlAgentService, ProgressSource, RemoteAgentService, RemoteError};
pub use session::SessionManager;
