//! Progress Aggregator
//!
//! Subscribes to the four agent progress channels for a request and folds
//! the updates into one [`AgentProgressState`] per request id. The display
//! phase is derived from that state on demand.
//!
//! Channel failures never reach the caller: a subscription that cannot be
//! opened, or a stream that yields an error, is logged and the last
//! known-good value for that stage is kept.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use clear_ai_core::{AgentProgressState, AgentStage, Phase, ProgressEvent};

use crate::services::remote::ProgressSource;

type ProgressStates = Arc<RwLock<HashMap<String, AgentProgressState>>>;

/// Per-request progress fold fed by live subscriptions.
#[derive(Default)]
pub struct ProgressAggregator {
    states: ProgressStates,
    subscriptions: Mutex<HashMap<String, CancellationToken>>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one update. The newest update for a stage replaces the old one
    /// regardless of its percent.
    pub async fn apply(&self, event: ProgressEvent) {
        let mut states = self.states.write().await;
        states
            .entry(event.request_id.clone())
            .or_default()
            .apply(event);
    }

    /// Display phase for a request. Unknown ids are `Starting`.
    pub async fn phase(&self, request_id: &str) -> Phase {
        self.states
            .read()
            .await
            .get(request_id)
            .map(AgentProgressState::phase)
            .unwrap_or(Phase::Starting)
    }

    /// The last update per stage
    pub async fn raw(&self, request_id: &str) -> AgentProgressState {
        self.states
            .read()
            .await
            .get(request_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn is_complete(&self, request_id: &str) -> bool {
        self.phase(request_id).await == Phase::Complete
    }

    pub async fn is_tracking(&self, request_id: &str) -> bool {
        self.subscriptions.lock().await.contains_key(request_id)
    }

    /// Ids with live subscriptions
    pub async fn tracked_requests(&self) -> Vec<String> {
        self.subscriptions.lock().await.keys().cloned().collect()
    }

    /// Open one subscription per stage channel for `request_id`.
    ///
    /// Returns `false` if the id is already tracked.
    pub async fn track(&self, request_id: &str, source: Arc<dyn ProgressSource>) -> bool {
        let token = {
            let mut subscriptions = self.subscriptions.lock().await;
            if subscriptions.contains_key(request_id) {
                return false;
            }
            let token = CancellationToken::new();
            subscriptions.insert(request_id.to_string(), token.clone());
            token
        };

        tracing::debug!("[Progress] tracking {}", request_id);
        for stage in AgentStage::ALL {
            tokio::spawn(follow_channel(
                stage,
                request_id.to_string(),
                Arc::clone(&source),
                Arc::clone(&self.states),
                token.clone(),
            ));
        }
        true
    }

    /// Stop the subscriptions for `request_id` and forget its progress.
    pub async fn clear(&self, request_id: &str) {
        if let Some(token) = self.subscriptions.lock().await.remove(request_id) {
            token.cancel();
        }
        self.states.write().await.remove(request_id);
        tracing::debug!("[Progress] cleared {}", request_id);
    }

    /// Stop every subscription and forget all progress
    pub async fn clear_all(&self) {
        for (_, token) in self.subscriptions.lock().await.drain() {
            token.cancel();
        }
        self.states.write().await.clear();
    }
}

/// Pump one channel into the shared state until it ends or is cancelled.
async fn follow_channel(
    stage: AgentStage,
    request_id: String,
    source: Arc<dyn ProgressSource>,
    states: ProgressStates,
    token: CancellationToken,
) {
    let mut stream = tokio::select! {
        _ = token.cancelled() => return,
        opened = source.subscribe(stage, &request_id) => match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("[Progress] {} subscription for {} failed: {}", stage.channel(), request_id, e);
                return;
            }
        },
    };

    loop {
        let item = tokio::select! {
            _ = token.cancelled() => break,
            item = stream.next() => item,
        };

        match item {
            Some(Ok(event)) => {
                if event.request_id != request_id || event.stage != stage {
                    tracing::warn!(
                        "[Progress] dropping {} update for {} on {} channel of {}",
                        event.stage,
                        event.request_id,
                        stage.channel(),
                        request_id
                    );
                    continue;
                }
                let mut states = states.write().await;
                // clear() cancels before removing state; checking under the
                // lock keeps a late update from resurrecting the entry
                if token.is_cancelled() {
                    break;
                }
                states.entry(request_id.clone()).or_default().apply(event);
            }
            Some(Err(e)) => {
                tracing::warn!("[Progress] {} error for {}: {}", stage.channel(), request_id, e);
            }
            None => break,
        }
    }

    tracing::debug!("[Progress] {} closed for {}", stage.channel(), request_id);
}
