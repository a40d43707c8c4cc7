//! Session Manager
//!
//! Owns the ordered list of conversational sessions and the active-session
//! pointer. Every mutation bumps the session's `updated_at` and saves the
//! whole list as a JSON snapshot under the `session-store` name. Storage
//! failures are logged and the in-memory state stays authoritative.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{Message, Session, SessionList, SessionStatus, SessionUpdate};
use crate::storage::Database;
use crate::utils::clock::{system_clock, Clock};
use crate::utils::error::AppResult;

/// Name of the persisted session snapshot
pub const SESSION_STORE: &str = "session-store";

pub struct SessionManager {
    list: RwLock<SessionList>,
    database: Option<Database>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Memory-only manager on the system clock
    pub fn new() -> Self {
        Self::with_clock(None, system_clock())
    }

    /// Manager persisted to `database`, rehydrated from its last snapshot
    pub fn with_database(database: Database) -> Self {
        Self::with_clock(Some(database), system_clock())
    }

    pub fn with_clock(database: Option<Database>, clock: Arc<dyn Clock>) -> Self {
        let list = database.as_ref().map(rehydrate).unwrap_or_default();
        Self {
            list: RwLock::new(list),
            database,
            clock,
        }
    }

    /// Create a session, append it and make it active
    pub async fn create_session(&self) -> String {
        let session = Session::new(self.clock.now());
        let id = session.id.clone();

        let mut list = self.list.write().await;
        list.sessions.push(session);
        list.active_session_id = Some(id.clone());
        self.persist(&list);

        tracing::info!("[Sessions] created {}", id);
        id
    }

    /// Point the active session at `id`. Unknown ids are ignored.
    pub async fn switch_session(&self, id: &str) -> bool {
        let mut list = self.list.write().await;
        if !list.contains(id) {
            tracing::debug!("[Sessions] switch to unknown session {} ignored", id);
            return false;
        }
        list.active_session_id = Some(id.to_string());
        self.persist(&list);
        true
    }

    /// Remove a session. Closing the active session activates the first
    /// remaining one, or none.
    pub async fn close_session(&self, id: &str) -> Option<Session> {
        let mut list = self.list.write().await;
        let index = list.sessions.iter().position(|s| s.id == id)?;
        let removed = list.sessions.remove(index);

        if list.active_session_id.as_deref() == Some(id) {
            list.active_session_id = list.sessions.first().map(|s| s.id.clone());
        }
        self.persist(&list);

        tracing::info!("[Sessions] closed {}", id);
        Some(removed)
    }

    /// Append a message to a session. Unknown ids are ignored.
    pub async fn add_message(&self, session_id: &str, message: Message) -> bool {
        self.mutate(session_id, |session| session.messages.push(message))
            .await
    }

    pub async fn update_session(&self, session_id: &str, update: SessionUpdate) -> bool {
        self.mutate(session_id, |session| {
            if let Some(name) = update.display_name {
                session.display_name = name;
            }
            if let Some(status) = update.status {
                session.status = status;
            }
        })
        .await
    }

    pub async fn rename_session(&self, session_id: &str, name: impl Into<String>) -> bool {
        self.update_session(
            session_id,
            SessionUpdate {
                display_name: Some(name.into()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn set_status(&self, session_id: &str, status: SessionStatus) -> bool {
        self.update_session(
            session_id,
            SessionUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn active_session_id(&self) -> Option<String> {
        self.list.read().await.active_session_id.clone()
    }

    pub async fn active_session(&self) -> Option<Session> {
        let list = self.list.read().await;
        let id = list.active_session_id.as_deref()?;
        list.find(id).cloned()
    }

    pub async fn session(&self, id: &str) -> Option<Session> {
        self.list.read().await.find(id).cloned()
    }

    /// All sessions in creation order
    pub async fn sessions(&self) -> Vec<Session> {
        self.list.read().await.sessions.clone()
    }

    /// Every message that carries a pipeline result, across all sessions
    pub async fn messages_with_request_data(&self) -> Vec<Message> {
        let list = self.list.read().await;
        list.sessions
            .iter()
            .flat_map(|s| s.messages.iter())
            .filter(|m| m.has_request_data())
            .cloned()
            .collect()
    }

    pub async fn sessions_by_status(&self, status: SessionStatus) -> Vec<Session> {
        let list = self.list.read().await;
        list.sessions
            .iter()
            .filter(|s| s.status == status)
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over message content
    pub async fn search_messages(&self, query: &str) -> Vec<Message> {
        let needle = query.to_lowercase();
        let list = self.list.read().await;
        list.sessions
            .iter()
            .flat_map(|s| s.messages.iter())
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Apply `f` to one session and bump its `updated_at`
    async fn mutate(&self, session_id: &str, f: impl FnOnce(&mut Session)) -> bool {
        let now = self.clock.now();
        let mut list = self.list.write().await;
        let Some(session) = list.find_mut(session_id) else {
            tracing::debug!("[Sessions] update for unknown session {} ignored", session_id);
            return false;
        };

        f(session);
        session.updated_at = next_updated_at(session.updated_at, now);
        self.persist(&list);
        true
    }

    fn persist(&self, list: &SessionList) {
        let Some(db) = &self.database else {
            return;
        };
        if let Err(e) = save_snapshot(db, list) {
            tracing::warn!("[Sessions] failed to persist session list: {}", e);
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `now`, or one microsecond past `previous` when the clock has not moved
fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

fn save_snapshot(db: &Database, list: &SessionList) -> AppResult<()> {
    let json = serde_json::to_string(list)?;
    db.save_store(SESSION_STORE, &json)
}

fn rehydrate(db: &Database) -> SessionList {
    let snapshot = match db.load_store(SESSION_STORE) {
        Ok(Some(json)) => json,
        Ok(None) => return SessionList::default(),
        Err(e) => {
            tracing::warn!("[Sessions] failed to load session list: {}", e);
            return SessionList::default();
        }
    };

    match serde_json::from_str::<SessionList>(&snapshot) {
        Ok(mut list) => {
            list.repair_active_pointer();
            tracing::info!("[Sessions] restored {} sessions", list.sessions.len());
            list
        }
        Err(e) => {
            tracing::warn!("[Sessions] discarding unreadable session list: {}", e);
            SessionList::default()
        }
    }
}
