//! REST client for the CMS workflow-manager endpoints.
//!
//! [`WorkflowApi`] wraps every backend call the panel makes. Callers that
//! only need the operations (and tests that want an in-memory stand-in)
//! depend on the [`WorkflowBackend`] trait instead.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod messages;

pub use api::WorkflowApi;
pub use backend::WorkflowBackend;
pub use config::{ApiConfig, ConfigError};
pub use error::ApiError;
