use std::sync::Arc;

use tokio::sync::RwLock;

use wfm_client::messages::{EntityRef, NewState};
use wfm_client::WorkflowBackend;
use wfm_core::drafts::StateDraft;
use wfm_core::error::CoreError;
use wfm_core::model::{GroupInfo, PermissionInfo, State, Workflow};
use wfm_core::titles::validate_title;
use wfm_core::types::{RoleName, StateId};

use super::DraftBuffer;
use crate::detail::{not_found, DetailStore};
use crate::error::PanelError;
use crate::notify::{Notification, NotificationBus};
use crate::ops::OpStatus;
use crate::requests::{EntityKind, RequestKey, RequestTracker};
use crate::validation::ValidationRunner;

/// Reference data for the state editing tabs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateOptions {
    pub available_transitions: Vec<EntityRef>,
    pub managed_permissions: Vec<PermissionInfo>,
    pub available_roles: Vec<RoleName>,
    pub groups: Vec<GroupInfo>,
}

#[derive(Debug, Default)]
struct Slots {
    options: Option<StateOptions>,
    add: OpStatus<StateId>,
    delete: OpStatus<StateId>,
}

/// Edits, adds, and deletes the states of the loaded workflow.
pub struct StateEditor<B> {
    backend: Arc<B>,
    bus: Arc<NotificationBus>,
    detail: Arc<DetailStore<B>>,
    requests: Arc<RequestTracker>,
    validation: Arc<ValidationRunner<B>>,
    buffer: DraftBuffer<StateDraft>,
    slots: RwLock<Slots>,
}

impl<B: WorkflowBackend> StateEditor<B> {
    pub fn new(
        backend: Arc<B>,
        bus: Arc<NotificationBus>,
        detail: Arc<DetailStore<B>>,
        requests: Arc<RequestTracker>,
        validation: Arc<ValidationRunner<B>>,
    ) -> Self {
        Self {
            backend,
            bus,
            detail,
            requests,
            validation,
            buffer: DraftBuffer::default(),
            slots: RwLock::new(Slots::default()),
        }
    }

    pub fn buffer(&self) -> &DraftBuffer<StateDraft> {
        &self.buffer
    }

    pub async fn options(&self) -> Option<StateOptions> {
        self.slots.read().await.options.clone()
    }

    pub async fn add_status(&self) -> OpStatus<StateId> {
        self.slots.read().await.add.clone()
    }

    pub async fn delete_status(&self) -> OpStatus<StateId> {
        self.slots.read().await.delete.clone()
    }

    /// Fetch a fresh copy of `state_id` and start editing it. Any unsaved
    /// draft for the previous selection is dropped.
    ///
    /// Selecting again before this completes supersedes it.
    pub async fn select(&self, state_id: &str) -> Result<(), PanelError> {
        let workflow = self.loaded().await?;
        let ticket = self
            .requests
            .begin(RequestKey::new(EntityKind::State, workflow.id.as_str()));

        let result = self.backend.get_state(&workflow.id, state_id).await;
        if !self.requests.finish(&ticket) {
            tracing::debug!(state_id = %state_id, "Dropping stale state selection");
            return Err(PanelError::Superseded);
        }

        match result {
            Ok(details) => {
                let mut draft = StateDraft::from_state(&workflow, &details.state);
                draft.is_initial_state = details.is_initial_state;
                self.buffer.select(&details.state.id, draft).await;
                self.slots.write().await.options = Some(StateOptions {
                    available_transitions: details.available_transitions,
                    managed_permissions: details.managed_permissions,
                    available_roles: details.available_roles,
                    groups: details.groups,
                });
                tracing::debug!(workflow_id = %workflow.id, state_id = %state_id, "State selected");
                Ok(())
            }
            Err(e) => {
                if e.is_not_found() {
                    self.buffer.clear().await;
                }
                tracing::error!(state_id = %state_id, error = %e, "Failed to load state");
                self.bus
                    .publish(Notification::error("Error loading state", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Pull the detail store's copy of the selected state (server wins).
    pub async fn sync(&self) {
        let Some(id) = self.buffer.selected_id().await else {
            return;
        };
        let snapshot = self.detail.snapshot().await.and_then(|w| local_draft(&w, &id));
        self.buffer.sync(&id, snapshot).await;
    }

    /// Send the pending changes of the selected state. Returns `false` when
    /// there was nothing to save.
    pub async fn save(&self) -> Result<bool, PanelError> {
        let workflow = self.loaded().await?;
        let Some(draft) = self.buffer.draft().await else {
            return Err(CoreError::NotLoaded("no state selected").into());
        };
        let Some(pending) = self.buffer.pending_payload().await else {
            return Ok(false);
        };
        if pending.contains("title") {
            let checked = validate_title(
                &draft.title,
                workflow.state_titles(),
                Some(pending.id.as_str()),
            );
            if let Err(e) = checked {
                self.bus
                    .publish(Notification::warning("Cannot save state", e.to_string()));
                return Err(e.into());
            }
        }

        let Some(payload) = self.buffer.begin_save().await? else {
            return Ok(false);
        };
        let result = self
            .backend
            .update_state(&workflow.id, &payload.id, &payload.body())
            .await;
        self.buffer.finish_save(&result).await;

        match result {
            Ok(()) => {
                tracing::info!(workflow_id = %workflow.id, state_id = %payload.id, "State saved");
                self.bus.publish(Notification::success(
                    "State saved",
                    format!("State '{}' was updated.", draft.title.trim()),
                ));
                self.validation.invalidate(&workflow.id).await;
                if let Ok(fresh) = self.detail.reload().await {
                    self.buffer
                        .reselect(&payload.id, local_draft(&fresh, &payload.id))
                        .await;
                }
                Ok(true)
            }
            Err(e) => {
                tracing::error!(state_id = %payload.id, error = %e, "Failed to save state");
                self.bus
                    .publish(Notification::error("Error saving state", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Create a state titled `title`, optionally copying another state's
    /// transitions and role grants.
    pub async fn add_state(
        &self,
        title: &str,
        description: &str,
        clone_from: Option<&str>,
    ) -> Result<State, PanelError> {
        let workflow = self.loaded().await?;
        if let Err(e) = check_new_state(&workflow, title, clone_from) {
            self.bus
                .publish(Notification::warning("Cannot add state", e.to_string()));
            return Err(e);
        }

        self.slots.write().await.add.start();
        let request = NewState {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            clone_from_id: clone_from.map(str::to_string),
        };
        let result = self.backend.add_state(&workflow.id, &request).await;

        match result {
            Ok(state) => {
                tracing::info!(workflow_id = %workflow.id, state_id = %state.id, "State added");
                self.slots.write().await.add = OpStatus::Success(state.id.clone());
                self.bus.publish(Notification::success(
                    "State created",
                    format!("State '{}' was added.", request.title),
                ));
                self.reload_after_mutation(&workflow.id).await;
                Ok(state)
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow.id, error = %e, "Failed to add state");
                self.slots.write().await.add = OpStatus::Failure(e.user_message());
                self.bus
                    .publish(Notification::error("Error adding state", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Delete `state_id`. When transitions lead to it, `replacement` names
    /// the state they are redirected to.
    pub async fn delete_state(
        &self,
        state_id: &str,
        replacement: Option<&str>,
    ) -> Result<(), PanelError> {
        let workflow = self.loaded().await?;
        if let Err(e) = check_delete_state(&workflow, state_id, replacement) {
            self.bus
                .publish(Notification::warning("Cannot delete state", e.to_string()));
            return Err(e);
        }

        self.slots.write().await.delete.start();
        let result = self
            .backend
            .delete_state(&workflow.id, state_id, replacement)
            .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    workflow_id = %workflow.id,
                    state_id = %state_id,
                    replacement = ?replacement,
                    "State deleted",
                );
                self.slots.write().await.delete = OpStatus::Success(state_id.to_string());
                if self.buffer.selected_id().await.as_deref() == Some(state_id) {
                    self.buffer.clear().await;
                }
                self.bus.publish(Notification::success(
                    "State deleted",
                    format!("State '{state_id}' was deleted."),
                ));
                self.reload_after_mutation(&workflow.id).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(state_id = %state_id, error = %e, "Failed to delete state");
                self.slots.write().await.delete = OpStatus::Failure(e.user_message());
                self.bus
                    .publish(Notification::error("Error deleting state", e.user_message()));
                Err(e.into())
            }
        }
    }

    // ---- private helpers ----

    async fn loaded(&self) -> Result<Workflow, PanelError> {
        self.detail
            .snapshot()
            .await
            .ok_or_else(|| CoreError::NotLoaded("no workflow loaded").into())
    }

    /// The sanity report no longer describes the workflow after a change.
    async fn reload_after_mutation(&self, workflow_id: &str) {
        self.validation.invalidate(workflow_id).await;
        match self.detail.reload().await {
            Ok(_) => self.sync().await,
            Err(e) => tracing::warn!(error = %e, "Reload after state change failed"),
        }
    }
}

fn local_draft(workflow: &Workflow, state_id: &str) -> Option<StateDraft> {
    workflow
        .state(state_id)
        .map(|state| StateDraft::from_state(workflow, state))
}

fn check_new_state(workflow: &Workflow, title: &str, clone_from: Option<&str>) -> Result<(), PanelError> {
    validate_title(title, workflow.state_titles(), None)?;
    if let Some(source) = clone_from {
        if workflow.state(source).is_none() {
            return Err(not_found("state", source));
        }
    }
    Ok(())
}

fn check_delete_state(
    workflow: &Workflow,
    state_id: &str,
    replacement: Option<&str>,
) -> Result<(), PanelError> {
    if workflow.state(state_id).is_none() {
        return Err(not_found("state", state_id));
    }

    match replacement {
        Some(replacement) if replacement == state_id => Err(CoreError::Validation(
            "a state cannot replace itself".into(),
        )
        .into()),
        Some(replacement) if workflow.state(replacement).is_none() => {
            Err(not_found("state", replacement))
        }
        Some(_) => Ok(()),
        None if workflow
            .transitions
            .iter()
            .any(|t| t.destination() == Some(state_id)) =>
        {
            Err(CoreError::Validation(format!(
                "state '{state_id}' is the destination of one or more transitions; a replacement state is required"
            ))
            .into())
        }
        None => Ok(()),
    }
}
