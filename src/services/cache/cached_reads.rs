//! Cached Read Paths
//!
//! Read-through lookups for data the UI browses outside the main pipeline.
//! Each read consults [`ResultCache`] first and falls back to the remote
//! [`CatalogService`], caching the answer with the category's default TTL.
//! Remote errors propagate and leave the cache untouched.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::result_cache::{CacheCategory, ResultCache};
use crate::models::{ExecutionResults, PlanResult, Statistics, StatisticsKind, ToolInfo};
use crate::services::remote::{CatalogService, RemoteError};

/// Key under which the full tool listing is cached
pub const TOOL_LISTING_KEY: &str = "*";

pub struct CachedReads {
    cache: Arc<ResultCache>,
    catalog: Arc<dyn CatalogService>,
}

impl CachedReads {
    pub fn new(cache: Arc<ResultCache>, catalog: Arc<dyn CatalogService>) -> Self {
        Self { cache, catalog }
    }

    /// A plan by request id
    pub async fn plan(&self, request_id: &str) -> Result<PlanResult, RemoteError> {
        self.read_through(CacheCategory::Plans, request_id, || {
            self.catalog.get_plan(request_id)
        })
        .await
    }

    /// Execution results by execution id
    pub async fn execution(&self, execution_id: &str) -> Result<ExecutionResults, RemoteError> {
        self.read_through(CacheCategory::Executions, execution_id, || {
            self.catalog.get_execution(execution_id)
        })
        .await
    }

    /// The full tool listing. Each tool is also cached under its own name.
    pub async fn tools(&self) -> Result<Vec<ToolInfo>, RemoteError> {
        if let Some(hit) = self.cached::<Vec<ToolInfo>>(CacheCategory::Tools, TOOL_LISTING_KEY).await {
            return Ok(hit);
        }

        let tools = self.catalog.list_tools().await?;
        self.store(CacheCategory::Tools, TOOL_LISTING_KEY, &tools).await;
        for tool in &tools {
            self.store(CacheCategory::Tools, &tool.name, tool).await;
        }
        Ok(tools)
    }

    /// One tool by name, fetching the listing on a miss
    pub async fn tool(&self, name: &str) -> Result<ToolInfo, RemoteError> {
        if let Some(hit) = self.cached::<ToolInfo>(CacheCategory::Tools, name).await {
            return Ok(hit);
        }

        self.tools()
            .await?
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| RemoteError::MissingData(format!("tool {}", name)))
    }

    /// A statistics report by kind
    pub async fn statistics(&self, kind: StatisticsKind) -> Result<Statistics, RemoteError> {
        self.read_through(CacheCategory::Statistics, kind.as_str(), || {
            self.catalog.get_statistics(kind)
        })
        .await
    }

    async fn read_through<T, F, Fut>(
        &self,
        category: CacheCategory,
        key: &str,
        fetch: F,
    ) -> Result<T, RemoteError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        if let Some(hit) = self.cached(category, key).await {
            return Ok(hit);
        }

        let value = fetch().await?;
        self.store(category, key, &value).await;
        Ok(value)
    }

    async fn cached<T: DeserializeOwned>(&self, category: CacheCategory, key: &str) -> Option<T> {
        match self.cache.get_json::<T>(category, key).await {
            Ok(Some(hit)) => {
                tracing::debug!("[Cache] hit {}/{}", category, key);
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("[Cache] ignoring undecodable {}/{}: {}", category, key, e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, category: CacheCategory, key: &str, value: &T) {
        if let Err(e) = self.cache.set_json(category, key, value, None).await {
            tracing::warn!("[Cache] failed to cache {}/{}: {}", category, key, e);
        }
    }
}
