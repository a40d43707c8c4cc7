//! Sessions
//!
//! Multi-session conversation state.

pub mod manager;

pub use manager::{SessionManager, SESSION_STORE};
