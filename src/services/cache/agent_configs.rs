//! Agent Configuration Catalog
//!
//! Cached view of the analyzer and summarizer configurations stored on the
//! server. The full listing is cached under one key; every mutation goes
//! straight to the remote and drops that key so the next read refetches.

use std::sync::Arc;

use super::result_cache::{CacheCategory, ResultCache};
use crate::models::agent_config::{self, AgentConfig, AgentType};
use crate::models::{CreateAgentConfigInput, UpdateAgentConfigInput};
use crate::services::remote::{AgentConfigService, RemoteError};

/// Key under which the full configuration listing is cached
pub const CONFIG_LISTING_KEY: &str = "*";

pub struct AgentConfigCatalog {
    cache: Arc<ResultCache>,
    remote: Arc<dyn AgentConfigService>,
}

impl AgentConfigCatalog {
    pub fn new(cache: Arc<ResultCache>, remote: Arc<dyn AgentConfigService>) -> Self {
        Self { cache, remote }
    }

    /// Every configuration the server knows, active or not
    pub async fn list(&self) -> Result<Vec<AgentConfig>, RemoteError> {
        match self
            .cache
            .get_json::<Vec<AgentConfig>>(CacheCategory::AgentConfigs, CONFIG_LISTING_KEY)
            .await
        {
            Ok(Some(hit)) => {
                tracing::debug!("[AgentConfigs] listing served from cache");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("[AgentConfigs] ignoring undecodable listing: {}", e),
        }

        let configs = self.remote.list_agent_configs(None, None).await?;
        if let Err(e) = self
            .cache
            .set_json(CacheCategory::AgentConfigs, CONFIG_LISTING_KEY, &configs, None)
            .await
        {
            tracing::warn!("[AgentConfigs] failed to cache listing: {}", e);
        }
        Ok(configs)
    }

    /// Active configurations of one type
    pub async fn configs_by_type(&self, agent_type: AgentType) -> Result<Vec<AgentConfig>, RemoteError> {
        Ok(agent_config::configs_by_type(&self.list().await?, agent_type))
    }

    pub async fn default_config(&self, agent_type: AgentType) -> Result<Option<AgentConfig>, RemoteError> {
        Ok(agent_config::default_config(&self.list().await?, agent_type))
    }

    /// One configuration by id; `None` when the listing has no such id
    pub async fn config(&self, id: &str) -> Result<Option<AgentConfig>, RemoteError> {
        Ok(self.list().await?.into_iter().find(|c| c.id == id))
    }

    pub async fn create(&self, input: &CreateAgentConfigInput) -> Result<AgentConfig, RemoteError> {
        let created = self.remote.create_agent_config(input).await?;
        tracing::info!("[AgentConfigs] created {} ({})", created.id, created.agent_type);
        self.invalidate().await;
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        input: &UpdateAgentConfigInput,
    ) -> Result<AgentConfig, RemoteError> {
        let updated = self.remote.update_agent_config(id, input).await?;
        self.invalidate().await;
        Ok(updated)
    }

    /// Returns whether the server removed anything
    pub async fn delete(&self, id: &str) -> Result<bool, RemoteError> {
        let deleted = self.remote.delete_agent_config(id).await?;
        if deleted {
            tracing::info!("[AgentConfigs] deleted {}", id);
        }
        self.invalidate().await;
        Ok(deleted)
    }

    /// Make `id` the default for its type. The server clears the flag on the
    /// previous default.
    pub async fn set_default(&self, id: &str) -> Result<AgentConfig, RemoteError> {
        let config = self.remote.set_default_config(id).await?;
        self.invalidate().await;
        Ok(config)
    }

    pub async fn clone_config(&self, id: &str, name: &str) -> Result<AgentConfig, RemoteError> {
        let cloned = self.remote.clone_agent_config(id, name).await?;
        self.invalidate().await;
        Ok(cloned)
    }

    async fn invalidate(&self) {
        self.cache.delete(CacheCategory::AgentConfigs, CONFIG_LISTING_KEY).await;
    }
}
