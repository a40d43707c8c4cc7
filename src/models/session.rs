//! Session Models
//!
//! Conversational sessions and the messages in them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::pipeline::StageResultBundle;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry of a session's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set on assistant messages produced by a pipeline run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<StageResultBundle>,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp,
            request_id: None,
            request_data: None,
        }
    }

    /// A user query. Never carries a request id.
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::User, content, timestamp)
    }

    /// The assistant reply for a finished run
    pub fn assistant_result(
        content: impl Into<String>,
        request_id: impl Into<String>,
        bundle: StageResultBundle,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: Some(request_id.into()),
            request_data: Some(bundle),
            ..Self::new(MessageRole::Assistant, content, timestamp)
        }
    }

    /// A plain assistant message without request data
    pub fn assistant_error(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::Assistant, content, timestamp)
    }

    pub fn has_request_data(&self) -> bool {
        self.request_data.is_some()
    }
}

/// A conversational session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh active session named after its creation time
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: format!("Session {}", now.format("%H:%M:%S")),
            messages: Vec::new(),
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Request ids of every pipeline result in this session
    pub fn request_ids(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().filter_map(|m| m.request_id.as_deref())
    }
}

/// Partial update for a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub display_name: Option<String>,
    pub status: Option<SessionStatus>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.status.is_none()
    }
}

/// The persisted shape of the session list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionList {
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub active_session_id: Option<String>,
}

impl SessionList {
    pub fn find(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Drop an active pointer that names no session
    pub fn repair_active_pointer(&mut self) {
        if let Some(id) = &self.active_session_id {
            if !self.contains(id) {
                self.active_session_id = None;
            }
        }
    }
}
