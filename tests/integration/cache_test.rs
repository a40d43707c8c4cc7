//! Cache Integration Tests
//!
//! TTL behaviour of the result cache and the read-through catalog lookups,
//! driven by a manual clock.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use clear_ai_client::models::StatisticsKind;
use clear_ai_client::services::cache::CacheCategory;
use clear_ai_client::services::remote::RemoteError;
use clear_ai_client::storage::Database;
use clear_ai_client::AppConfig;

use crate::fakes::{app_state, app_state_with_db, FakeRemote};

#[tokio::test]
async fn test_entry_expires_after_its_ttl() {
    let remote = Arc::new(FakeRemote::new("req-1"));
    let (state, clock) = app_state(remote, AppConfig::default());
    let cache = state.cache();

    cache
        .set(
            CacheCategory::Plans,
            "req-1",
            json!({ "requestId": "req-1" }),
            Some(Duration::from_millis(1000)),
        )
        .await;

    clock.advance(Duration::from_millis(500));
    assert_eq!(
        cache.get(CacheCategory::Plans, "req-1").await,
        Some(json!({ "requestId": "req-1" }))
    );

    clock.advance(Duration::from_millis(1000));
    assert_eq!(cache.get(CacheCategory::Plans, "req-1").await, None);

    clock.advance(Duration::from_millis(500));
    assert_eq!(cache.get(CacheCategory::Plans, "req-1").await, None);
}

#[tokio::test]
async fn test_categories_are_separate() {
    let remote = Arc::new(FakeRemote::new("req-2"));
    let (state, _clock) = app_state(remote, AppConfig::default());
    let cache = state.cache();

    cache.set(CacheCategory::Plans, "same", json!(1), None).await;
    cache.set(CacheCategory::Executions, "same", json!(2), None).await;

    cache.clear(CacheCategory::Plans).await;

    assert_eq!(cache.get(CacheCategory::Plans, "same").await, None);
    assert_eq!(cache.get(CacheCategory::Executions, "same").await, Some(json!(2)));
}

#[tokio::test]
async fn test_plan_reads_go_through_cache() {
    let remote = Arc::new(FakeRemote::new("req-3"));
    let (state, clock) = app_state(remote.clone(), AppConfig::default());

    let first = state.reads().plan("req-3").await.unwrap();
    let second = state.reads().plan("req-3").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(remote.catalog_calls.load(Ordering::SeqCst), 1);

    // plans live for five minutes
    clock.advance(Duration::from_secs(5 * 60 + 1));
    state.reads().plan("req-3").await.unwrap();
    assert_eq!(remote.catalog_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_execution_reads_use_shorter_ttl() {
    let remote = Arc::new(FakeRemote::new("req-4"));
    let (state, clock) = app_state(remote.clone(), AppConfig::default());

    let result = state.reads().execution("exec-9").await.unwrap();
    assert_eq!(result.execution_id.as_deref(), Some("exec-9"));

    clock.advance(Duration::from_secs(2 * 60));
    state.reads().execution("exec-9").await.unwrap();
    assert_eq!(remote.catalog_calls.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(1));
    state.reads().execution("exec-9").await.unwrap();
    assert_eq!(remote.catalog_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_tool_lookup_reuses_listing() {
    let remote = Arc::new(FakeRemote::new("req-5"));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());

    let tools = state.reads().tools().await.unwrap();
    assert_eq!(tools.len(), 1);

    let tool = state.reads().tool("shipments.list").await.unwrap();
    assert_eq!(tool.name, "shipments.list");

    let missing = state.reads().tool("invoices.list").await.unwrap_err();
    assert!(matches!(missing, RemoteError::MissingData(_)));

    assert_eq!(remote.catalog_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_statistics_cached_per_kind() {
    let remote = Arc::new(FakeRemote::new("req-6"));
    let (state, _clock) = app_state(remote.clone(), AppConfig::default());

    for kind in StatisticsKind::ALL {
        let stats = state.reads().statistics(kind).await.unwrap();
        assert_eq!(stats.kind, kind);
    }
    for kind in StatisticsKind::ALL {
        state.reads().statistics(kind).await.unwrap();
    }

    assert_eq!(
        remote.catalog_calls.load(Ordering::SeqCst),
        StatisticsKind::ALL.len()
    );
}

#[tokio::test]
async fn test_cached_entries_survive_restart() {
    let database = Database::new_in_memory().unwrap();
    let remote = Arc::new(FakeRemote::new("req-7"));

    {
        let (state, _clock) =
            app_state_with_db(remote.clone(), AppConfig::default(), database.clone());
        state.reads().plan("req-7").await.unwrap();
    }

    let (restored, _clock) = app_state_with_db(remote.clone(), AppConfig::default(), database);
    assert!(restored.cache().is_persistent());
    restored.reads().plan("req-7").await.unwrap();

    assert_eq!(remote.catalog_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_memory_only_cache_starts_empty() {
    let database = Database::new_in_memory().unwrap();
    let remote = Arc::new(FakeRemote::new("req-8"));
    let config = AppConfig {
        persist_cache: false,
        ..Default::default()
    };

    {
        let (state, _clock) = app_state_with_db(remote.clone(), config.clone(), database.clone());
        assert!(!state.cache().is_persistent());
        state.reads().plan("req-8").await.unwrap();
    }

    let (restored, _clock) = app_state_with_db(remote.clone(), config, database);
    restored.reads().plan("req-8").await.unwrap();

    assert_eq!(remote.catalog_calls.load(Ordering::SeqCst), 2);
}
