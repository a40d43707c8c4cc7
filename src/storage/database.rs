//! SQLite Database
//!
//! Embedded database for persistent storage using rusqlite with r2d2 connection pooling.
//!
//! Two tables:
//! - `stores`: named JSON snapshots (the session list lives under `session-store`)
//! - `cache_entries`: result cache rows partitioned by category

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{database_path, ensure_dir};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Raw cache row from the database
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRow {
    pub category: String,
    pub key: String,
    /// Serialized JSON payload
    pub payload: String,
    /// RFC 3339 insertion time
    pub inserted_at: String,
    pub ttl_ms: i64,
}

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl Database {
    /// Create a database from an existing connection pool.
    pub fn from_pool(pool: DbPool) -> AppResult<Self> {
        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// A single pooled connection that is never recycled, so the data lives
    /// as long as the `Database` does.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        Self::from_pool(pool)
    }

    /// Open the database at the default location (~/.clear-ai/data.db)
    pub fn new() -> AppResult<Self> {
        Self::open(&database_path()?)
    }

    /// Open (or create) a database file at `path`
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        tracing::debug!("[Database] opened {}", path.display());
        Self::from_pool(pool)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS stores (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                category TEXT NOT NULL,
                key TEXT NOT NULL,
                payload TEXT NOT NULL,
                inserted_at TEXT NOT NULL,
                ttl_ms INTEGER NOT NULL,
                PRIMARY KEY (category, key)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cache_entries_category ON cache_entries(category)",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }

    // ========================================================================
    // Named Stores
    // ========================================================================

    /// Load a named store's JSON snapshot
    pub fn load_store(&self, name: &str) -> AppResult<Option<String>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT value FROM stores WHERE name = ?1",
            params![name],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Replace a named store's snapshot
    pub fn save_store(&self, name: &str, value: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO stores (name, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET value = ?2, updated_at = CURRENT_TIMESTAMP",
            params![name, value],
        )?;
        Ok(())
    }

    pub fn delete_store(&self, name: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
        Ok(())
    }

    // ========================================================================
    // Cache Entries
    // ========================================================================

    /// Insert or overwrite a cache row
    pub fn cache_put(&self, row: &CacheRow) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (category, key, payload, inserted_at, ttl_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![row.category, row.key, row.payload, row.inserted_at, row.ttl_ms],
        )?;
        Ok(())
    }

    /// Look up a cache row; expiry is left to the caller
    pub fn cache_get(&self, category: &str, key: &str) -> AppResult<Option<CacheRow>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT category, key, payload, inserted_at, ttl_ms FROM cache_entries
             WHERE category = ?1 AND key = ?2",
            params![category, key],
            |row| {
                Ok(CacheRow {
                    category: row.get(0)?,
                    key: row.get(1)?,
                    payload: row.get(2)?,
                    inserted_at: row.get(3)?,
                    ttl_ms: row.get(4)?,
                })
            },
        );

        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    pub fn cache_delete(&self, category: &str, key: &str) -> AppResult<u64> {
        let conn = self.get_connection()?;
        let count = conn.execute(
            "DELETE FROM cache_entries WHERE category = ?1 AND key = ?2",
            params![category, key],
        )?;
        Ok(count as u64)
    }

    /// Drop every row in one category
    pub fn cache_clear(&self, category: &str) -> AppResult<u64> {
        let conn = self.get_connection()?;
        let count = conn.execute(
            "DELETE FROM cache_entries WHERE category = ?1",
            params![category],
        )?;
        Ok(count as u64)
    }

    pub fn cache_clear_all(&self) -> AppResult<u64> {
        let conn = self.get_connection()?;
        let count = conn.execute("DELETE FROM cache_entries", [])?;
        Ok(count as u64)
    }

    /// Number of stored rows in a category, expired ones included
    pub fn cache_count(&self, category: &str) -> AppResult<u64> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE category = ?1",
            params![category],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================
