//! Data Models
//!
//! Contains all data structures used throughout the client.

pub mod agent_config;
pub mod catalog;
pub mod pipeline;
pub mod session;
pub mod settings;

pub use agent_config::*;
pub use catalog::*;
pub use pipeline::*;
pub use session::*;
pub use settings::*;
