//! Result Cache
//!
//! Category-partitioned key/value cache for remote response payloads with
//! per-entry TTL. Expired entries are evicted lazily on read; there is no
//! background sweep and no size bound.
//!
//! Entries live in memory and, when a database is attached, are written
//! through to the `cache_entries` table so they survive a restart. Storage
//! failures degrade the cache to memory-only for that operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::storage::{CacheRow, Database};
use crate::utils::clock::{system_clock, Clock};
use crate::utils::error::{AppError, AppResult};

/// Independent cache partitions, one per kind of remote payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    /// Plans keyed by request id
    Plans,
    /// Execution results keyed by execution id
    Executions,
    /// Tool descriptions keyed by tool name
    Tools,
    /// Statistics reports keyed by report type
    Statistics,
    /// Analyzer and summarizer configurations
    #[serde(rename = "agentConfigs")]
    AgentConfigs,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 5] = [
        CacheCategory::Plans,
        CacheCategory::Executions,
        CacheCategory::Tools,
        CacheCategory::Statistics,
        CacheCategory::AgentConfigs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Plans => "plans",
            CacheCategory::Executions => "executions",
            CacheCategory::Tools => "tools",
            CacheCategory::Statistics => "statistics",
            CacheCategory::AgentConfigs => "agentConfigs",
        }
    }

    /// TTL used when `set` is not given one
    pub fn default_ttl(&self) -> Duration {
        match self {
            CacheCategory::Plans => Duration::from_secs(5 * 60),
            CacheCategory::Executions => Duration::from_secs(2 * 60),
            CacheCategory::Tools => Duration::from_secs(60 * 60),
            CacheCategory::Statistics => Duration::from_secs(5 * 60),
            CacheCategory::AgentConfigs => Duration::from_secs(5 * 60),
        }
    }
}

impl std::fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CacheEntry {
    payload: Value,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    /// Expired once strictly more than `ttl` has elapsed. A clock that went
    /// backwards never expires an entry.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (now - self.inserted_at).to_std() {
            Ok(elapsed) => elapsed > self.ttl,
            Err(_) => false,
        }
    }

    fn to_row(&self, category: CacheCategory, key: &str) -> AppResult<CacheRow> {
        Ok(CacheRow {
            category: category.as_str().to_string(),
            key: key.to_string(),
            payload: serde_json::to_string(&self.payload)?,
            inserted_at: self.inserted_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ttl_ms: i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX),
        })
    }

    fn from_row(row: &CacheRow) -> AppResult<Self> {
        let inserted_at = DateTime::parse_from_rfc3339(&row.inserted_at)
            .map_err(|e| AppError::database(format!("Bad cache timestamp: {}", e)))?
            .with_timezone(&Utc);
        Ok(Self {
            payload: serde_json::from_str(&row.payload)?,
            inserted_at,
            ttl: Duration::from_millis(u64::try_from(row.ttl_ms).unwrap_or(0)),
        })
    }
}

type Partitions = HashMap<CacheCategory, HashMap<String, CacheEntry>>;

/// TTL cache for remote results.
pub struct ResultCache {
    entries: RwLock<Partitions>,
    database: Option<Database>,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    /// Memory-only cache on the system clock
    pub fn new() -> Self {
        Self::with_clock(None, system_clock())
    }

    /// Cache writing through to `database`
    pub fn with_database(database: Database) -> Self {
        Self::with_clock(Some(database), system_clock())
    }

    pub fn with_clock(database: Option<Database>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            database,
            clock,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.database.is_some()
    }

    /// Store `payload` under `(category, key)`, replacing any previous entry.
    pub async fn set(
        &self,
        category: CacheCategory,
        key: &str,
        payload: Value,
        ttl: Option<Duration>,
    ) {
        let entry = CacheEntry {
            payload,
            inserted_at: self.clock.now(),
            ttl: ttl.unwrap_or_else(|| category.default_ttl()),
        };

        let mut entries = self.entries.write().await;
        self.store_put(category, key, &entry);
        entries
            .entry(category)
            .or_default()
            .insert(key.to_string(), entry);
        tracing::debug!("[Cache] set {}/{}", category, key);
    }

    /// Fetch a live entry. An expired entry is deleted and reported as a miss.
    pub async fn get(&self, category: CacheCategory, key: &str) -> Option<Value> {
        let now = self.clock.now();

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&category).and_then(|p| p.get(key)) {
                if !entry.is_expired(now) {
                    return Some(entry.payload.clone());
                }
            }
        }

        let mut entries = self.entries.write().await;
        let partition = entries.entry(category).or_default();

        if let Some(entry) = partition.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.payload.clone());
            }
            partition.remove(key);
            self.store_delete(category, key);
            tracing::debug!("[Cache] expired {}/{}", category, key);
            return None;
        }

        match self.store_get(category, key) {
            Some(entry) if !entry.is_expired(now) => {
                let payload = entry.payload.clone();
                partition.insert(key.to_string(), entry);
                tracing::debug!("[Cache] rehydrated {}/{}", category, key);
                Some(payload)
            }
            Some(_) => {
                self.store_delete(category, key);
                tracing::debug!("[Cache] expired {}/{} (stored)", category, key);
                None
            }
            None => None,
        }
    }

    /// Remove one entry. Removing a missing entry is a no-op.
    pub async fn delete(&self, category: CacheCategory, key: &str) {
        let mut entries = self.entries.write().await;
        if let Some(partition) = entries.get_mut(&category) {
            partition.remove(key);
        }
        self.store_delete(category, key);
    }

    /// Empty one category, leaving the others untouched
    pub async fn clear(&self, category: CacheCategory) {
        let mut entries = self.entries.write().await;
        entries.remove(&category);
        if let Some(db) = &self.database {
            if let Err(e) = db.cache_clear(category.as_str()) {
                tracing::warn!("[Cache] failed to clear stored {}: {}", category, e);
            }
        }
        tracing::debug!("[Cache] cleared {}", category);
    }

    pub async fn clear_all(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        if let Some(db) = &self.database {
            if let Err(e) = db.cache_clear_all() {
                tracing::warn!("[Cache] failed to clear stored entries: {}", e);
            }
        }
        tracing::debug!("[Cache] cleared all categories");
    }

    /// Serialize `value` and store it
    pub async fn set_json<T: Serialize>(
        &self,
        category: CacheCategory,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()> {
        let payload = serde_json::to_value(value)?;
        self.set(category, key, payload, ttl).await;
        Ok(())
    }

    /// Fetch and decode a live entry
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        category: CacheCategory,
        key: &str,
    ) -> AppResult<Option<T>> {
        match self.get(category, key).await {
            Some(payload) => Ok(Some(serde_json::from_value(payload)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Write-through helpers
    // ========================================================================

    fn store_put(&self, category: CacheCategory, key: &str, entry: &CacheEntry) {
        let Some(db) = &self.database else {
            return;
        };
        let result = entry.to_row(category, key).and_then(|row| db.cache_put(&row));
        if let Err(e) = result {
            tracing::warn!("[Cache] failed to persist {}/{}: {}", category, key, e);
        }
    }

    fn store_get(&self, category: CacheCategory, key: &str) -> Option<CacheEntry> {
        let db = self.database.as_ref()?;
        let row = match db.cache_get(category.as_str(), key) {
            Ok(row) => row?,
            Err(e) => {
                tracing::warn!("[Cache] failed to read {}/{}: {}", category, key, e);
                return None;
            }
        };
        match CacheEntry::from_row(&row) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("[Cache] dropping unreadable {}/{}: {}", category, key, e);
                self.store_delete(category, key);
                None
            }
        }
    }

    fn store_delete(&self, category: CacheCategory, key: &str) {
        if let Some(db) = &self.database {
            if let Err(e) = db.cache_delete(category.as_str(), key) {
                tracing::warn!("[Cache] failed to delete {}/{}: {}", category, key, e);
            }
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
