//! Panel configuration: API connection plus the workflow to open.

use wfm_client::ApiConfig;
use wfm_core::types::WorkflowId;

use crate::error::PanelError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelConfig {
    pub api: ApiConfig,
    /// Workflow to open on start; the catalog only when unset.
    pub workflow: Option<WorkflowId>,
}

impl PanelConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Reads everything [`ApiConfig::from_env`] reads, plus:
    ///
    /// | Env Var        | Default |
    /// |----------------|---------|
    /// | `WFM_WORKFLOW` | unset   |
    pub fn from_env() -> Result<Self, PanelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PanelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workflow = lookup("WFM_WORKFLOW")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            api: ApiConfig::from_lookup(&lookup)?,
            workflow,
        })
    }
}
