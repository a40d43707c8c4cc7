//! Application State
//!
//! Explicit container owning one instance of each client service. The
//! presentation layer constructs it once at startup and shares it.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::models::{AgentConfig, AgentType, Session, StageResultBundle};
use crate::services::cache::{AgentConfigCatalog, CachedReads, ResultCache};
use crate::services::pipeline::{PipelineCoordinator, PipelineError, PipelineEvent};
use crate::services::progress::ProgressAggregator;
use crate::services::remote::{
    AgentConfigService, CatalogService, ProgressSource, RemoteAgentService,
};
use crate::services::session::SessionManager;
use crate::storage::{ConfigService, Database};
use crate::utils::clock::{system_clock, Clock};
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::init_logging;

/// The remote seams the client depends on.
#[derive(Clone)]
pub struct RemoteServices {
    pub agents: Arc<dyn RemoteAgentService>,
    pub progress: Arc<dyn ProgressSource>,
    pub catalog: Arc<dyn CatalogService>,
    pub agent_configs: Arc<dyn AgentConfigService>,
}

impl RemoteServices {
    /// Use one service object for every seam
    pub fn from_shared<S>(service: Arc<S>) -> Self
    where
        S: RemoteAgentService + ProgressSource + CatalogService + AgentConfigService + 'static,
    {
        Self {
            agents: service.clone(),
            progress: service.clone(),
            catalog: service.clone(),
            agent_configs: service,
        }
    }
}

fn selected_config(config: &AppConfig, agent_type: AgentType) -> Option<&str> {
    match agent_type {
        AgentType::Analyzer => config.analyzer_config_id.as_deref(),
        AgentType::Summarizer => config.summarizer_config_id.as_deref(),
    }
}

/// Settings update that changes only the selection for `agent_type`.
/// An empty id clears it.
fn selection_update(agent_type: AgentType, id: &str) -> SettingsUpdate {
    match agent_type {
        AgentType::Analyzer => SettingsUpdate {
            analyzer_config_id: Some(id.to_string()),
            ..Default::default()
        },
        AgentType::Summarizer => SettingsUpdate {
            summarizer_config_id: Some(id.to_string()),
            ..Default::default()
        },
    }
}

/// Client state shared with the presentation layer
pub struct AppState {
    /// File-backed configuration, when loaded from disk
    config_service: Option<Mutex<ConfigService>>,
    config: RwLock<AppConfig>,
    database: Option<Database>,
    sessions: Arc<SessionManager>,
    progress: Arc<ProgressAggregator>,
    progress_source: Arc<dyn ProgressSource>,
    cache: Arc<ResultCache>,
    pipeline: Arc<PipelineCoordinator>,
    reads: CachedReads,
    agent_configs: AgentConfigCatalog,
    /// Forwards newly created request ids to the progress aggregator
    progress_bridge: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    /// Load ~/.clear-ai/config.json, install logging, open ~/.clear-ai/data.db
    /// when persistence is enabled and wire every service to `services`.
    pub fn initialize(services: RemoteServices) -> AppResult<Self> {
        let config_service = ConfigService::new()?;
        let config = config_service.effective_config();
        init_logging(&config.log_level);

        let database = if config.persist_sessions || config.persist_cache {
            Some(Database::new()?)
        } else {
            None
        };

        let mut state = Self::with_parts(config, database, services, system_clock());
        state.config_service = Some(Mutex::new(config_service));
        tracing::info!("[State] initialized");
        Ok(state)
    }

    /// Build from explicit parts without touching the user's home directory.
    pub fn with_parts(
        config: AppConfig,
        database: Option<Database>,
        services: RemoteServices,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session_db = database.clone().filter(|_| config.persist_sessions);
        let cache_db = database.clone().filter(|_| config.persist_cache);

        let sessions = Arc::new(SessionManager::with_clock(session_db, clock.clone()));
        let cache = Arc::new(ResultCache::with_clock(cache_db, clock.clone()));
        let pipeline = Arc::new(
            PipelineCoordinator::with_clock(services.agents, sessions.clone(), clock)
                .with_options(config.pipeline_options()),
        );
        let reads = CachedReads::new(cache.clone(), services.catalog);
        let agent_configs = AgentConfigCatalog::new(cache.clone(), services.agent_configs);

        Self {
            config_service: None,
            config: RwLock::new(config),
            database,
            sessions,
            progress: Arc::new(ProgressAggregator::new()),
            progress_source: services.progress,
            cache,
            pipeline,
            reads,
            agent_configs,
            progress_bridge: Mutex::new(None),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn progress(&self) -> &Arc<ProgressAggregator> {
        &self.progress
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn pipeline(&self) -> &Arc<PipelineCoordinator> {
        &self.pipeline
    }

    pub fn reads(&self) -> &CachedReads {
        &self.reads
    }

    pub fn agent_configs(&self) -> &AgentConfigCatalog {
        &self.agent_configs
    }

    pub fn database(&self) -> Option<&Database> {
        self.database.as_ref()
    }

    /// Check if database is healthy
    pub fn is_database_healthy(&self) -> bool {
        self.database.as_ref().is_some_and(Database::is_healthy)
    }

    /// Get the current configuration
    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Update the configuration. Saved to disk when file-backed; later runs
    /// pick up the new stage options.
    pub async fn update_config(&self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let updated = match &self.config_service {
            Some(service) => {
                let mut service = service.lock().await;
                service.update_config(update)?;
                service.effective_config()
            }
            None => {
                let mut next = self.config.read().await.clone();
                next.apply_update(update);
                next.validate().map_err(AppError::validation)?;
                next
            }
        };

        *self.config.write().await = updated.clone();
        self.pipeline.set_options(updated.pipeline_options()).await;
        Ok(updated)
    }

    /// Select the analyzer or summarizer configuration later runs use.
    /// `None` falls back to the server default.
    pub async fn select_agent_config(
        &self,
        agent_type: AgentType,
        id: Option<&str>,
    ) -> AppResult<AppConfig> {
        if let Some(id) = id {
            let config = self
                .agent_configs
                .config(id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("agent config {}", id)))?;
            if config.agent_type != agent_type {
                return Err(AppError::validation(format!(
                    "agent config {} is a {} config, not {}",
                    id, config.agent_type, agent_type
                )));
            }
        }
        self.update_config(selection_update(agent_type, id.unwrap_or_default()))
            .await
    }

    /// The configuration currently selected for `agent_type`, if any
    pub async fn selected_agent_config(&self, agent_type: AgentType) -> AppResult<Option<AgentConfig>> {
        let current = self.get_config().await;
        match selected_config(&current, agent_type) {
            Some(id) => Ok(self.agent_configs.config(id).await?),
            None => Ok(None),
        }
    }

    /// Delete a configuration on the server. A selection pointing at it is
    /// cleared so later runs fall back to the server default.
    pub async fn delete_agent_config(&self, id: &str) -> AppResult<bool> {
        let deleted = self.agent_configs.delete(id).await?;

        let current = self.get_config().await;
        for agent_type in [AgentType::Analyzer, AgentType::Summarizer] {
            if selected_config(&current, agent_type) == Some(id) {
                tracing::info!("[State] clearing {} selection {}", agent_type, id);
                self.update_config(selection_update(agent_type, "")).await?;
            }
        }
        Ok(deleted)
    }

    /// Run a query in the active session, tracking its progress.
    pub async fn run_query(&self, query: &str) -> Result<StageResultBundle, PipelineError> {
        self.ensure_progress_bridge().await;
        self.pipeline.run(query).await
    }

    /// Close a session and drop the progress state of its requests
    pub async fn close_session(&self, id: &str) -> Option<Session> {
        let closed = self.sessions.close_session(id).await?;
        for request_id in closed.request_ids() {
            self.progress.clear(request_id).await;
        }
        Some(closed)
    }

    async fn ensure_progress_bridge(&self) {
        let mut bridge = self.progress_bridge.lock().await;
        if bridge.is_some() {
            return;
        }

        // subscribe before spawning so the first run's events are not missed
        let mut events = self.pipeline.subscribe();
        let progress = Arc::clone(&self.progress);
        let source = Arc::clone(&self.progress_source);

        *bridge = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PipelineEvent::RequestCreated { request_id, .. }) => {
                        progress.track(&request_id, Arc::clone(&source)).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[State] progress bridge skipped {} pipeline events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(handle) = self.progress_bridge.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.database)
            .field("file_config", &self.config_service.is_some())
            .finish()
    }
}
