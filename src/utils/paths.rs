//! Cross-Platform Path Utilities
//!
//! Resolves the client's data directory (~/.clear-ai/) and the files in it.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Clear AI directory (~/.clear-ai/)
pub fn clear_ai_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".clear-ai"))
}

/// Get the config file path (~/.clear-ai/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(clear_ai_dir()?.join("config.json"))
}

/// Get the database file path (~/.clear-ai/data.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(clear_ai_dir()?.join("data.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Clear AI directory, creating it if it doesn't exist
pub fn ensure_clear_ai_dir() -> AppResult<PathBuf> {
    let path = clear_ai_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
