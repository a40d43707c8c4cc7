//! Storage Layer
//!
//! Persistent storage: the SQLite database and the JSON config file.

pub mod config;
pub mod database;

pub use config::ConfigService;
pub use database::{CacheRow, Database, DbPool};
