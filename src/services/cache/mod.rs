//! Result Caching
//!
//! The TTL result cache, the read-through paths built on it and the cached
//! agent configuration catalog.

pub mod agent_configs;
pub mod cached_reads;
pub mod result_cache;

pub use agent_configs::AgentConfigCatalog;
pub use cached_reads::CachedReads;
pub use result_cache::{CacheCategory, ResultCache};
