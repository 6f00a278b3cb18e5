//! The workflow catalog: the list of workflows plus create, rename, and
//! delete.
//!
//! Mutations run one at a time through a small phase machine:
//!
//! ```text
//! Idle -> Creating -> Idle (Created | CreateFailed)
//! Idle -> Renaming -> Idle (Renamed | RenameFailed)
//! Idle -> Deleting -> Idle (Deleted | DeleteFailed)
//! ```
//!
//! Each transition is driven by a single backend call. Failures are
//! reported through a notification and the recorded outcome; nothing is
//! retried. A successful mutation refreshes the list.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;

use wfm_client::WorkflowBackend;
use wfm_core::error::CoreError;
use wfm_core::model::WorkflowSummary;
use wfm_core::naming::workflow_id_from_name;
use wfm_core::titles::{validate_title, TitleError};
use wfm_core::types::WorkflowId;

use crate::error::PanelError;
use crate::notify::{Notification, NotificationBus};
use crate::ops::OpStatus;
use crate::requests::{EntityKind, RequestKey, RequestTracker};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogPhase {
    #[default]
    Idle,
    Creating,
    Renaming,
    Deleting,
}

impl fmt::Display for CatalogPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Creating => "creating",
            Self::Renaming => "renaming",
            Self::Deleting => "deleting",
        })
    }
}

/// Result of the last catalog mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOutcome {
    Created(WorkflowId),
    CreateFailed(String),
    Renamed(WorkflowId),
    RenameFailed(String),
    Deleted(WorkflowId),
    DeleteFailed(String),
}

#[derive(Debug, Default)]
struct CatalogState {
    workflows: Vec<WorkflowSummary>,
    phase: CatalogPhase,
    last_outcome: Option<CatalogOutcome>,
    list: OpStatus<usize>,
}

pub struct CatalogStore<B> {
    backend: Arc<B>,
    bus: Arc<NotificationBus>,
    requests: Arc<RequestTracker>,
    state: RwLock<CatalogState>,
}

impl<B: WorkflowBackend> CatalogStore<B> {
    pub fn new(backend: Arc<B>, bus: Arc<NotificationBus>, requests: Arc<RequestTracker>) -> Self {
        Self {
            backend,
            bus,
            requests,
            state: RwLock::new(CatalogState::default()),
        }
    }

    pub async fn workflows(&self) -> Vec<WorkflowSummary> {
        self.state.read().await.workflows.clone()
    }

    pub async fn summary(&self, workflow_id: &str) -> Option<WorkflowSummary> {
        self.state
            .read()
            .await
            .workflows
            .iter()
            .find(|w| w.id == workflow_id)
            .cloned()
    }

    pub async fn phase(&self) -> CatalogPhase {
        self.state.read().await.phase
    }

    pub async fn last_outcome(&self) -> Option<CatalogOutcome> {
        self.state.read().await.last_outcome.clone()
    }

    pub async fn list_status(&self) -> OpStatus<usize> {
        self.state.read().await.list.clone()
    }

    /// Reload the workflow list. Overlapping refreshes resolve to the
    /// newest one.
    pub async fn refresh(&self) -> Result<Vec<WorkflowSummary>, PanelError> {
        let ticket = self.requests.begin(RequestKey::new(EntityKind::Catalog, ""));
        self.state.write().await.list.start();

        let result = self.backend.list_workflows().await;
        if !self.requests.finish(&ticket) {
            return Err(PanelError::Superseded);
        }

        let mut state = self.state.write().await;
        match result {
            Ok(workflows) => {
                tracing::info!(count = workflows.len(), "Workflow catalog loaded");
                state.list = OpStatus::Success(workflows.len());
                state.workflows = workflows.clone();
                Ok(workflows)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load workflow catalog");
                state.list = OpStatus::Failure(e.user_message());
                drop(state);
                self.bus
                    .publish(Notification::error("Error loading workflows", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Clone `clone_from` into a new workflow titled `name`. Returns the new
    /// workflow's id.
    pub async fn create(&self, clone_from: &str, name: &str) -> Result<WorkflowId, PanelError> {
        if let Err(e) = self.check_create(clone_from, name).await {
            self.bus
                .publish(Notification::warning("Cannot create workflow", e.to_string()));
            return Err(e);
        }

        self.enter(CatalogPhase::Creating).await?;
        let name = name.trim();
        let result = self.backend.create_workflow(clone_from, name).await;

        match result {
            Ok(reply) => {
                let workflow_id = reply
                    .workflow_id
                    .unwrap_or_else(|| workflow_id_from_name(name));
                tracing::info!(
                    workflow_id = %workflow_id,
                    clone_from = %clone_from,
                    "Workflow created",
                );
                self.leave(CatalogOutcome::Created(workflow_id.clone())).await;
                self.bus.publish(Notification::success(
                    "Workflow created",
                    format!("Workflow '{name}' was created from '{clone_from}'."),
                ));
                self.refresh_after_mutation().await;
                Ok(workflow_id)
            }
            Err(e) => {
                tracing::error!(clone_from = %clone_from, error = %e, "Failed to create workflow");
                self.leave(CatalogOutcome::CreateFailed(e.user_message())).await;
                self.bus
                    .publish(Notification::error("Error creating workflow", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Change a workflow's title.
    pub async fn rename(&self, workflow_id: &str, title: &str) -> Result<(), PanelError> {
        if let Err(e) = self.check_rename(workflow_id, title).await {
            self.bus
                .publish(Notification::warning("Cannot rename workflow", e.to_string()));
            return Err(e);
        }

        self.enter(CatalogPhase::Renaming).await?;
        let title = title.trim();
        let result = self
            .backend
            .update_workflow(workflow_id, &json!({ "title": title }))
            .await;

        match result {
            Ok(()) => {
                tracing::info!(workflow_id = %workflow_id, title = %title, "Workflow renamed");
                self.leave(CatalogOutcome::Renamed(workflow_id.to_string())).await;
                self.bus.publish(Notification::success(
                    "Workflow renamed",
                    format!("Workflow is now titled '{title}'."),
                ));
                self.refresh_after_mutation().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Failed to rename workflow");
                self.leave(CatalogOutcome::RenameFailed(e.user_message())).await;
                self.bus
                    .publish(Notification::error("Error renaming workflow", e.user_message()));
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, workflow_id: &str) -> Result<(), PanelError> {
        self.enter(CatalogPhase::Deleting).await?;
        let result = self.backend.delete_workflow(workflow_id).await;

        match result {
            Ok(()) => {
                tracing::info!(workflow_id = %workflow_id, "Workflow deleted");
                self.leave(CatalogOutcome::Deleted(workflow_id.to_string())).await;
                self.bus.publish(Notification::success(
                    "Workflow deleted",
                    format!("Workflow '{workflow_id}' was deleted."),
                ));
                self.refresh_after_mutation().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Failed to delete workflow");
                self.leave(CatalogOutcome::DeleteFailed(e.user_message())).await;
                self.bus
                    .publish(Notification::error("Error deleting workflow", e.user_message()));
                Err(e.into())
            }
        }
    }

    // ---- private helpers ----

    async fn check_create(&self, clone_from: &str, name: &str) -> Result<(), PanelError> {
        if clone_from.trim().is_empty() {
            return Err(CoreError::Validation("a workflow to clone from is required".into()).into());
        }

        let state = self.state.read().await;
        let workflows = &state.workflows;
        if !workflows.is_empty() && !workflows.iter().any(|w| w.id == clone_from) {
            return Err(CoreError::NotFound {
                entity: "workflow",
                id: clone_from.to_string(),
            }
            .into());
        }

        validate_title(
            name,
            workflows.iter().map(|w| (w.id.as_str(), w.title.as_str())),
            None,
        )?;

        let derived = workflow_id_from_name(name);
        if let Some(existing) = workflows.iter().find(|w| w.id == derived) {
            return Err(TitleError::Duplicate {
                title: name.trim().to_string(),
                existing_id: existing.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn check_rename(&self, workflow_id: &str, title: &str) -> Result<(), PanelError> {
        let state = self.state.read().await;
        let workflows = &state.workflows;
        if !workflows.iter().any(|w| w.id == workflow_id) {
            return Err(CoreError::NotFound {
                entity: "workflow",
                id: workflow_id.to_string(),
            }
            .into());
        }

        validate_title(
            title,
            workflows.iter().map(|w| (w.id.as_str(), w.title.as_str())),
            Some(workflow_id),
        )?;
        Ok(())
    }

    async fn enter(&self, phase: CatalogPhase) -> Result<(), PanelError> {
        let mut state = self.state.write().await;
        if state.phase != CatalogPhase::Idle {
            return Err(CoreError::Conflict(format!(
                "cannot start {phase} while {} is in progress",
                state.phase
            ))
            .into());
        }
        state.phase = phase;
        Ok(())
    }

    async fn leave(&self, outcome: CatalogOutcome) {
        let mut state = self.state.write().await;
        state.phase = CatalogPhase::Idle;
        state.last_outcome = Some(outcome);
    }

    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Catalog refresh after mutation failed");
        }
    }
}
