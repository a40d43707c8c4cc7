//! Remote Boundary
//!
//! Traits the client core uses to reach the remote multi-agent service, and
//! a GraphQL implementation of them over a pluggable transport.
//!
//! ## Architecture
//!
//! ```text
//! PipelineCoordinator ──> RemoteAgentService ─┐
//! ProgressAggregator  ──> ProgressSource     ─┼─> GraphqlAgentService<T> ──> GraphqlTransport
//! CachedReads         ──> CatalogService     ─┤
//! AgentConfigCatalog  ──> AgentConfigService ─┘
//! ```

pub mod graphql;
pub mod service;
pub mod types;

pub use graphql::GraphqlAgentService;
pub use service::{
    AgentConfigService, CatalogService, GraphqlTransport, ProgressSource, RemoteAgentService,
};
pub use types::{
    GraphqlError, GraphqlRequest, GraphqlResponse, GraphqlStream, ProgressStream, RemoteError,
};
