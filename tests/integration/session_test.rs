//! Session Integration Tests
//!
//! Session lifecycle through `AppState`, including persistence to SQLite.

use std::sync::Arc;

use clear_ai_client::models::SessionStatus;
use clear_ai_client::storage::Database;
use clear_ai_client::{AgentStage, AppConfig, Phase};

use crate::fakes::{app_state, app_state_with_db, wait_for, FakeRemote};

#[tokio::test]
async fn test_sessions_survive_restart() {
    let database = Database::new_in_memory().unwrap();
    let remote = Arc::new(FakeRemote::new("req-1"));

    let (first_id, second_id) = {
        let (state, _clock) =
            app_state_with_db(remote.clone(), AppConfig::default(), database.clone());
        let first = state.sessions().create_session().await;
        state.run_query("Get shipments from last week").await.unwrap();
        let second = state.sessions().create_session().await;
        state.sessions().rename_session(&second, "Inventory").await;
        (first, second)
    };

    let (restored, _clock) = app_state_with_db(remote, AppConfig::default(), database);
    let sessions = restored.sessions().sessions().await;

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, first_id);
    assert_eq!(sessions[0].status, SessionStatus::Completed);
    assert_eq!(sessions[0].messages.len(), 2);
    assert!(sessions[0].messages[1].has_request_data());
    assert_eq!(sessions[1].display_name, "Inventory");
    assert_eq!(
        restored.sessions().active_session_id().await.as_deref(),
        Some(second_id.as_str())
    );
}

#[tokio::test]
async fn test_sessions_stay_in_memory_when_persistence_is_off() {
    let database = Database::new_in_memory().unwrap();
    let remote = Arc::new(FakeRemote::new("req-2"));
    let config = AppConfig {
        persist_sessions: false,
        ..Default::default()
    };

    {
        let (state, _clock) = app_state_with_db(remote.clone(), config.clone(), database.clone());
        state.sessions().create_session().await;
    }

    let (restored, _clock) = app_state_with_db(remote, config, database);
    assert!(restored.sessions().sessions().await.is_empty());
    assert!(restored.sessions().active_session_id().await.is_none());
}

#[tokio::test]
async fn test_closing_active_session_activates_first_remaining() {
    let remote = Arc::new(FakeRemote::new("req-3"));
    let (state, _clock) = app_state(remote, AppConfig::default());
    let a = state.sessions().create_session().await;
    let b = state.sessions().create_session().await;
    let c = state.sessions().create_session().await;

    state.close_session(&c).await.expect("session exists");
    assert_eq!(state.sessions().active_session_id().await.as_deref(), Some(a.as_str()));

    state.close_session(&a).await.unwrap();
    assert_eq!(state.sessions().active_session_id().await.as_deref(), Some(b.as_str()));

    state.close_session(&b).await.unwrap();
    assert!(state.sessions().active_session_id().await.is_none());
    assert!(state.close_session(&b).await.is_none());
}

#[tokio::test]
async fn test_closing_inactive_session_keeps_pointer() {
    let remote = Arc::new(FakeRemote::new("req-4"));
    let (state, _clock) = app_state(remote, AppConfig::default());
    let a = state.sessions().create_session().await;
    let b = state.sessions().create_session().await;

    state.close_session(&a).await.unwrap();

    assert_eq!(state.sessions().active_session_id().await.as_deref(), Some(b.as_str()));
    assert_eq!(state.sessions().sessions().await.len(), 1);
}

#[tokio::test]
async fn test_closing_session_drops_its_progress() {
    let remote = Arc::new(FakeRemote::new("req-5"));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    let session_id = state.sessions().create_session().await;

    state.run_query("Get shipments").await.unwrap();
    let progress = Arc::clone(state.progress());
    wait_for(|| {
        let progress = Arc::clone(&progress);
        async move { progress.is_tracking("req-5").await }
    })
    .await;

    remote.send_progress(AgentStage::Planner, 40);
    wait_for(|| {
        let progress = Arc::clone(&progress);
        async move { progress.phase("req-5").await == Phase::Planning }
    })
    .await;

    state.close_session(&session_id).await.unwrap();

    assert!(!state.progress().is_tracking("req-5").await);
    assert!(state.progress().raw("req-5").await.is_empty());
    assert_eq!(state.progress().phase("req-5").await, Phase::Starting);
}

#[tokio::test]
async fn test_queries_across_sessions() {
    let remote = Arc::new(FakeRemote::new("req-6"));
    let (state, _clock) = app_state(remote, AppConfig::default());

    state.sessions().create_session().await;
    state.run_query("Get shipments from last week").await.unwrap();
    let idle = state.sessions().create_session().await;

    let with_results = state.sessions().messages_with_request_data().await;
    assert_eq!(with_results.len(), 1);
    assert_eq!(with_results[0].request_id.as_deref(), Some("req-6"));

    let hits = state.sessions().search_messages("SHIPMENTS").await;
    assert_eq!(hits.len(), 2);

    let active = state.sessions().sessions_by_status(SessionStatus::Active).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, idle);
    assert_eq!(
        state.sessions().sessions_by_status(SessionStatus::Completed).await.len(),
        1
    );
}

#[tokio::test]
async fn test_switch_to_unknown_session_is_ignored() {
    let remote = Arc::new(FakeRemote::new("req-7"));
    let (state, _clock) = app_state(remote, AppConfig::default());
    let id = state.sessions().create_session().await;

    assert!(!state.sessions().switch_session("missing").await);
    assert_eq!(state.sessions().active_session_id().await.as_deref(), Some(id.as_str()));
}
