//! Request Pipeline
//!
//! The four-stage run driven for each user query.

pub mod coordinator;

pub use crate::models::PipelineOptions;
pub use coordinator::{PipelineCoordinator, PipelineError, PipelineEvent, GENERIC_ERROR_MESSAGE};
