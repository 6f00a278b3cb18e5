//! The panel's addressable location.
//!
//! The panel lives at `/controlpanel/workflowmanager`; the selected
//! workflow travels in the `workflow` query parameter.

use reqwest::Url;

use wfm_core::types::WorkflowId;

use crate::error::PanelError;

pub const PANEL_PATH: &str = "/controlpanel/workflowmanager";

const BASE: &str = "http://panel.local/";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelRoute {
    pub workflow: Option<WorkflowId>,
}

impl PanelRoute {
    pub fn catalog() -> Self {
        Self::default()
    }

    pub fn workflow(id: impl Into<WorkflowId>) -> Self {
        Self {
            workflow: Some(id.into()),
        }
    }

    /// Parse a relative or absolute panel location. A site prefix before
    /// the panel path is allowed.
    pub fn parse(location: &str) -> Result<Self, PanelError> {
        let base = Url::parse(BASE).map_err(|e| PanelError::Route(e.to_string()))?;
        let url = base
            .join(location.trim())
            .map_err(|e| PanelError::Route(format!("{location}: {e}")))?;

        if !url.path().trim_end_matches('/').ends_with(PANEL_PATH) {
            return Err(PanelError::Route(format!(
                "{location}: not a workflow manager location"
            )));
        }

        let workflow = url
            .query_pairs()
            .find(|(key, _)| key == "workflow")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Self { workflow })
    }

    /// Relative location for this route.
    pub fn to_path(&self) -> String {
        match &self.workflow {
            Some(id) => {
                let mut url = match Url::parse(BASE).and_then(|b| b.join(PANEL_PATH)) {
                    Ok(url) => url,
                    Err(_) => return PANEL_PATH.to_string(),
                };
                url.query_pairs_mut().append_pair("workflow", id);
                format!("{}?{}", url.path(), url.query().unwrap_or_default())
            }
            None => PANEL_PATH.to_string(),
        }
    }
}
