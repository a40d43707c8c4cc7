//! Pipeline Integration Tests
//!
//! Drives full runs through `AppState` against the scripted remote.

use std::sync::Arc;

use clear_ai_client::models::{MessageRole, SessionStatus};
use clear_ai_client::services::pipeline::{PipelineError, PipelineEvent, GENERIC_ERROR_MESSAGE};
use clear_ai_client::{AgentStage, AppConfig, SettingsUpdate};

use crate::fakes::{app_state, wait_for, Call, FakeRemote};

#[tokio::test]
async fn test_full_run_records_query_and_answer() {
    let remote = Arc::new(FakeRemote::new("req-1"));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    let session_id = state.sessions().create_session().await;

    let bundle = state
        .run_query("Get shipments from last week")
        .await
        .expect("run should succeed");

    assert_eq!(
        remote.call_names(),
        vec!["createPlan", "executeTools", "analyzeResults", "summarize"]
    );
    let ids: Vec<_> = remote.calls().iter().filter_map(|c| c.request_id().map(str::to_string)).collect();
    assert_eq!(ids, vec!["req-1", "req-1", "req-1"]);

    assert!(bundle.is_complete());
    assert_eq!(bundle.request_id(), Some("req-1"));

    let session = state.sessions().session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.messages.len(), 2);

    let user = &session.messages[0];
    assert_eq!(user.role, MessageRole::User);
    assert_eq!(user.content, "Get shipments from last week");
    assert!(user.request_id.is_none());

    let reply = &session.messages[1];
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(reply.content, "You had 12 shipments last week.");
    assert_eq!(reply.request_id.as_deref(), Some("req-1"));
    assert_eq!(reply.request_data.as_ref(), Some(&bundle));
}

#[tokio::test]
async fn test_execution_failure_stops_the_run() {
    let remote = Arc::new(FakeRemote::new("req-2").failing_at(AgentStage::Executor));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    let session_id = state.sessions().create_session().await;

    let err = state
        .run_query("Get shipments from last week")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ExecutionFailed(_)));
    assert_eq!(err.stage(), Some(AgentStage::Executor));
    assert_eq!(remote.call_names(), vec!["createPlan", "executeTools"]);

    let session = state.sessions().session(&session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.messages.len(), 2);
    let reply = &session.messages[1];
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(reply.content, GENERIC_ERROR_MESSAGE);
    assert!(reply.request_id.is_none());
    assert!(!reply.has_request_data());
}

#[tokio::test]
async fn test_planning_failure_reports_planner_stage() {
    let remote = Arc::new(FakeRemote::new("req-3").failing_at(AgentStage::Planner));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    state.sessions().create_session().await;

    let err = state.run_query("anything").await.unwrap_err();

    assert_eq!(err.stage(), Some(AgentStage::Planner));
    assert!(err.remote().is_some());
    assert_eq!(remote.call_names(), vec!["createPlan"]);
}

#[tokio::test]
async fn test_run_without_active_session_does_nothing() {
    let remote = Arc::new(FakeRemote::new("req-4"));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());

    let err = state.run_query("Get shipments").await.unwrap_err();

    assert!(matches!(err, PipelineError::NoActiveSession));
    assert_eq!(err.stage(), None);
    assert!(remote.calls().is_empty());
    assert!(state.sessions().sessions().await.is_empty());
}

#[tokio::test]
async fn test_empty_plan_still_runs_every_stage() {
    let remote = Arc::new(FakeRemote::new("req-5").with_steps(0));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    state.sessions().create_session().await;

    let bundle = state.run_query("nothing to do").await.unwrap();

    assert_eq!(bundle.plan().map(|p| p.step_count()), Some(0));
    assert_eq!(remote.calls().len(), 4);
}

#[tokio::test]
async fn test_result_lands_in_session_active_at_start() {
    let (remote, release) = FakeRemote::new("req-6").with_plan_gate();
    let remote = Arc::new(remote);
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());
    let state = Arc::new(state);
    let first = state.sessions().create_session().await;

    let run = tokio::spawn({
        let state = Arc::clone(&state);
        async move { state.run_query("Get shipments from last week").await }
    });

    // the user message is written before the planner is called
    wait_for(|| {
        let state = Arc::clone(&state);
        let first = first.clone();
        async move {
            state
                .sessions()
                .session(&first)
                .await
                .is_some_and(|s| s.messages.len() == 1)
        }
    })
    .await;

    let second = state.sessions().create_session().await;
    assert_eq!(state.sessions().active_session_id().await.as_deref(), Some(second.as_str()));
    release.send(()).unwrap();

    run.await.unwrap().expect("run should succeed");

    let first_session = state.sessions().session(&first).await.unwrap();
    assert_eq!(first_session.messages.len(), 2);
    assert_eq!(first_session.messages[1].request_id.as_deref(), Some("req-6"));
    assert!(state.sessions().session(&second).await.unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_configured_options_reach_each_stage() {
    let remote = Arc::new(FakeRemote::new("req-7"));
    let config = AppConfig {
        llm_provider: Some("openai".to_string()),
        analyzer_config_id: Some("strict".to_string()),
        summary_format: "MARKDOWN".to_string(),
        ..Default::default()
    };
    let (state, _clock) = app_state(remote.clone(), config);
    state.sessions().create_session().await;

    state.run_query("first").await.unwrap();

    state
        .update_config(SettingsUpdate {
            summarizer_config_id: Some("brief".to_string()),
            llm_provider: Some(String::new()),
            ..Default::default()
        })
        .await
        .unwrap();
    state.run_query("second").await.unwrap();

    let calls = remote.calls();
    assert_eq!(
        calls[0],
        Call::CreatePlan {
            query: "first".to_string(),
            llm_provider: Some("openai".to_string()),
        }
    );
    assert_eq!(
        calls[2],
        Call::AnalyzeResults {
            request_id: "req-7".to_string(),
            analyzer_config_id: Some("strict".to_string()),
        }
    );
    assert_eq!(
        calls[3],
        Call::Summarize {
            request_id: "req-7".to_string(),
            format: Some("MARKDOWN".to_string()),
            summarizer_config_id: None,
        }
    );

    assert_eq!(
        calls[4],
        Call::CreatePlan {
            query: "second".to_string(),
            llm_provider: None,
        }
    );
    assert_eq!(
        calls[7],
        Call::Summarize {
            request_id: "req-7".to_string(),
            format: Some("MARKDOWN".to_string()),
            summarizer_config_id: Some("brief".to_string()),
        }
    );
}

#[tokio::test]
async fn test_invalid_config_update_is_rejected() {
    let remote = Arc::new(FakeRemote::new("req-8"));
    let (state, _clock) = app_state(remote, AppConfig::default());

    let result = state
        .update_config(SettingsUpdate {
            summary_format: Some("HAIKU".to_string()),
            ..Default::default()
        })
        .await;

    assert!(result.is_err());
    assert_eq!(state.get_config().await.summary_format, "INTELLIGENT");
}

#[tokio::test]
async fn test_events_follow_stage_order() {
    let remote = Arc::new(FakeRemote::new("req-9"));
    let (state, _clock) = app_state(remote, AppConfig::default());
    let session_id = state.sessions().create_session().await;
    let mut events = state.pipeline().subscribe();

    state.run_query("Get shipments").await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert_eq!(
        seen.first(),
        Some(&PipelineEvent::StageStarted {
            session_id: session_id.clone(),
            stage: AgentStage::Planner,
        })
    );
    assert!(seen.contains(&PipelineEvent::RequestCreated {
        session_id: session_id.clone(),
        request_id: "req-9".to_string(),
    }));
    let completed: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageCompleted { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(completed, AgentStage::ALL.to_vec());
    assert_eq!(
        seen.last(),
        Some(&PipelineEvent::Completed {
            session_id,
            request_id: "req-9".to_string(),
        })
    );
}
