//! Utilities
//!
//! Common utilities used throughout the client.

pub mod clock;
pub mod error;
pub mod logging;
pub mod paths;

pub use clock::*;
pub use error::*;
pub use logging::*;
pub use paths::*;
