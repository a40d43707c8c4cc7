//! Agent Configuration Integration Tests
//!
//! Browsing, selecting and deleting analyzer and summarizer configurations
//! through `AppState`, and the effect of a selection on pipeline runs.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use clear_ai_client::models::{AgentType, CreateAgentConfigInput, UpdateAgentConfigInput};
use clear_ai_client::services::cache::CacheCategory;
use clear_ai_client::{AppConfig, AppError};

use crate::fakes::{agent_config, app_state, Call, FakeRemote};

fn remote_with_configs() -> Arc<FakeRemote> {
    Arc::new(FakeRemote::new("req-1").with_agent_configs(vec![
        agent_config("an-strict", AgentType::Analyzer, true),
        agent_config("an-loose", AgentType::Analyzer, false),
        agent_config("sum-brief", AgentType::Summarizer, true),
    ]))
}

#[tokio::test]
async fn test_listing_is_cached_until_a_mutation() {
    let remote = remote_with_configs();
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    let catalog = state.agent_configs();

    assert_eq!(catalog.configs_by_type(AgentType::Analyzer).await.unwrap().len(), 2);
    assert_eq!(
        catalog.default_config(AgentType::Summarizer).await.unwrap().map(|c| c.id),
        Some("sum-brief".to_string())
    );
    assert_eq!(remote.agent_config_lists.load(Ordering::SeqCst), 1);
    assert!(state.cache().get(CacheCategory::AgentConfigs, "*").await.is_some());

    catalog.set_default("an-loose").await.unwrap();
    assert!(state.cache().get(CacheCategory::AgentConfigs, "*").await.is_none());
    assert_eq!(
        catalog.default_config(AgentType::Analyzer).await.unwrap().map(|c| c.id),
        Some("an-loose".to_string())
    );
    assert_eq!(remote.agent_config_lists.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_create_update_and_clone_show_up_in_listing() {
    let remote = remote_with_configs();
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    let catalog = state.agent_configs();
    catalog.list().await.unwrap();

    let created = catalog
        .create(&CreateAgentConfigInput {
            name: "Tabular".to_string(),
            agent_type: AgentType::Summarizer,
            description: Some("Answers as tables".to_string()),
            config: json!({ "format": "table" }),
            is_active: None,
        })
        .await
        .unwrap();
    assert_eq!(catalog.configs_by_type(AgentType::Summarizer).await.unwrap().len(), 2);

    catalog
        .update(
            &created.id,
            &UpdateAgentConfigInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(catalog.configs_by_type(AgentType::Summarizer).await.unwrap().len(), 1);

    let cloned = catalog.clone_config("an-strict", "Strict copy").await.unwrap();
    let listed = catalog.config(&cloned.id).await.unwrap().unwrap();
    assert_eq!(listed.name, "Strict copy");
    assert!(!listed.is_default);
}

#[tokio::test]
async fn test_selection_is_passed_to_the_analyzer() {
    let remote = remote_with_configs();
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    state.sessions().create_session().await;

    let config = state
        .select_agent_config(AgentType::Analyzer, Some("an-loose"))
        .await
        .unwrap();
    assert_eq!(config.analyzer_config_id.as_deref(), Some("an-loose"));
    assert_eq!(
        state
            .selected_agent_config(AgentType::Analyzer)
            .await
            .unwrap()
            .map(|c| c.id),
        Some("an-loose".to_string())
    );

    state.run_query("Which carriers were late?").await.unwrap();
    assert!(remote.calls().contains(&Call::AnalyzeResults {
        request_id: "req-1".to_string(),
        analyzer_config_id: Some("an-loose".to_string()),
    }));
}

#[tokio::test]
async fn test_selecting_unknown_config_is_not_found() {
    let remote = remote_with_configs();
    let (state, _clock) = app_state(remote, AppConfig::default());

    let result = state
        .select_agent_config(AgentType::Analyzer, Some("an-missing"))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(state.get_config().await.analyzer_config_id.is_none());
}

#[tokio::test]
async fn test_selecting_config_of_other_type_is_rejected() {
    let remote = remote_with_configs();
    let (state, _clock) = app_state(remote, AppConfig::default());

    let result = state
        .select_agent_config(AgentType::Summarizer, Some("an-strict"))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(state.get_config().await.summarizer_config_id.is_none());
}

#[tokio::test]
async fn test_selecting_none_clears_selection() {
    let remote = remote_with_configs();
    let config = AppConfig {
        summarizer_config_id: Some("sum-brief".to_string()),
        ..AppConfig::default()
    };
    let (state, _clock) = app_state(remote, config);

    let config = state
        .select_agent_config(AgentType::Summarizer, None)
        .await
        .unwrap();
    assert!(config.summarizer_config_id.is_none());
    assert!(state
        .selected_agent_config(AgentType::Summarizer)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_deleting_selected_config_clears_selection() {
    let remote = remote_with_configs();
    let config = AppConfig {
        analyzer_config_id: Some("an-strict".to_string()),
        summarizer_config_id: Some("sum-brief".to_string()),
        ..AppConfig::default()
    };
    let (state, _clock) = app_state(remote.clone(), config);

    assert!(state.delete_agent_config("an-strict").await.unwrap());

    let config = state.get_config().await;
    assert!(config.analyzer_config_id.is_none());
    assert_eq!(config.summarizer_config_id.as_deref(), Some("sum-brief"));
    assert!(remote.stored_agent_configs().iter().all(|c| c.id != "an-strict"));
    assert!(state.agent_configs().config("an-strict").await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_unselected_config_keeps_selection() {
    let remote = remote_with_configs();
    let config = AppConfig {
        analyzer_config_id: Some("an-strict".to_string()),
        ..AppConfig::default()
    };
    let (state, _clock) = app_state(remote, config);

    assert!(state.delete_agent_config("an-loose").await.unwrap());
    assert!(!state.delete_agent_config("an-loose").await.unwrap());
    assert_eq!(
        state.get_config().await.analyzer_config_id.as_deref(),
        Some("an-strict")
    );
}
