use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use wfm_client::messages::{EntityRef, GuardOptions, NewTransition};
use wfm_client::WorkflowBackend;
use wfm_core::drafts::TransitionDraft;
use wfm_core::error::CoreError;
use wfm_core::model::{Transition, Workflow};
use wfm_core::naming::slugify;
use wfm_core::titles::validate_title;
use wfm_core::types::{StateId, TransitionId};

use super::DraftBuffer;
use crate::detail::{not_found, DetailStore};
use crate::error::PanelError;
use crate::notify::{Notification, NotificationBus};
use crate::ops::OpStatus;
use crate::requests::{EntityKind, RequestKey, RequestTracker};
use crate::validation::ValidationRunner;

/// Input of [`TransitionEditor::add_transition`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTransitionSpec {
    pub title: String,
    pub description: String,
    /// State the transition leads to.
    pub destination: Option<StateId>,
    /// States that may fire the transition.
    pub source_states: Vec<StateId>,
    pub clone_from: Option<TransitionId>,
}

impl NewTransitionSpec {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn to(mut self, destination: impl Into<StateId>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn from_state(mut self, source: impl Into<StateId>) -> Self {
        self.source_states.push(source.into());
        self
    }

    /// The id the backend derives from the title.
    pub fn id(&self) -> TransitionId {
        slugify(&self.title)
    }
}

/// Reference data for the transition editing tabs.
#[derive(Debug, Clone, Default)]
pub struct TransitionOptions {
    pub available_states: Vec<EntityRef>,
    pub guard_options: GuardOptions,
}

#[derive(Debug, Default)]
struct Slots {
    options: Option<TransitionOptions>,
    add: OpStatus<TransitionId>,
    delete: OpStatus<TransitionId>,
}

/// Edits, adds, and deletes the transitions of the loaded workflow.
pub struct TransitionEditor<B> {
    backend: Arc<B>,
    bus: Arc<NotificationBus>,
    detail: Arc<DetailStore<B>>,
    requests: Arc<RequestTracker>,
    validation: Arc<ValidationRunner<B>>,
    buffer: DraftBuffer<TransitionDraft>,
    slots: RwLock<Slots>,
}

impl<B: WorkflowBackend> TransitionEditor<B> {
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

    pub fn buffer(&self) -> &DraftBuffer<TransitionDraft> {
        &self.buffer
    }

    pub async fn options(&self) -> Option<TransitionOptions> {
        self.slots.read().await.options.clone()
    }

    pub async fn add_status(&self) -> OpStatus<TransitionId> {
        self.slots.read().await.add.clone()
    }

    pub async fn delete_status(&self) -> OpStatus<TransitionId> {
        self.slots.read().await.delete.clone()
    }

    /// Fetch a fresh copy of `transition_id` and start editing it. Source
    /// states come from the detail store's index.
    pub async fn select(&self, transition_id: &str) -> Result<(), PanelError> {
        let workflow = self.loaded().await?;
        let ticket = self
            .requests
            .begin(RequestKey::new(EntityKind::Transition, workflow.id.as_str()));

        let result = self.backend.get_transition(&workflow.id, transition_id).await;
        if !self.requests.finish(&ticket) {
            tracing::debug!(transition_id = %transition_id, "Dropping stale transition selection");
            return Err(PanelError::Superseded);
        }

        match result {
            Ok(details) => {
                let sources = self.detail.sources_of(&details.transition.id).await;
                let draft = TransitionDraft::from_transition(&details.transition, &sources);
                self.buffer.select(&details.transition.id, draft).await;
                self.slots.write().await.options = Some(TransitionOptions {
                    available_states: details.available_states,
                    guard_options: details.guard_options,
                });
                tracing::debug!(
                    workflow_id = %workflow.id,
                    transition_id = %transition_id,
                    "Transition selected",
                );
                Ok(())
            }
            Err(e) => {
                if e.is_not_found() {
                    self.buffer.clear().await;
                }
                tracing::error!(transition_id = %transition_id, error = %e, "Failed to load transition");
                self.bus
                    .publish(Notification::error("Error loading transition", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Pull the detail store's copy of the selected transition (server wins).
    pub async fn sync(&self) {
        let Some(id) = self.buffer.selected_id().await else {
            return;
        };
        let snapshot = match self.detail.snapshot().await {
            Some(workflow) => {
                let sources = self.detail.sources_of(&id).await;
                local_draft(&workflow, &id, &sources)
            }
            None => None,
        };
        self.buffer.sync(&id, snapshot).await;
    }

    /// Send the pending changes of the selected transition. Returns `false`
    /// when there was nothing to save.
    pub async fn save(&self) -> Result<bool, PanelError> {
        let workflow = self.loaded().await?;
        let Some(draft) = self.buffer.draft().await else {
            return Err(CoreError::NotLoaded("no transition selected").into());
        };
        let Some(pending) = self.buffer.pending_payload().await else {
            return Ok(false);
        };
        if pending.contains("title") {
            let checked = validate_title(
                &draft.title,
                workflow.transition_titles(),
                Some(pending.id.as_str()),
            );
            if let Err(e) = checked {
                self.bus
                    .publish(Notification::warning("Cannot save transition", e.to_string()));
                return Err(e.into());
            }
        }
        if let Some(destination) = draft.new_state_id.as_deref() {
            if workflow.state(destination).is_none() {
                return Err(not_found("state", destination));
            }
        }

        let Some(payload) = self.buffer.begin_save().await? else {
            return Ok(false);
        };
        let result = self
            .backend
            .update_transition(&workflow.id, &payload.id, &payload.body())
            .await;
        self.buffer.finish_save(&result).await;

        match result {
            Ok(()) => {
                tracing::info!(
                    workflow_id = %workflow.id,
                    transition_id = %payload.id,
                    "Transition saved",
                );
                self.bus.publish(Notification::success(
                    "Transition saved",
                    format!("Transition '{}' was updated.", draft.title.trim()),
                ));
                self.validation.invalidate(&workflow.id).await;
                if let Ok(fresh) = self.detail.reload().await {
                    let sources = self.detail.sources_of(&payload.id).await;
                    self.buffer
                        .reselect(&payload.id, local_draft(&fresh, &payload.id, &sources))
                        .await;
                }
                Ok(true)
            }
            Err(e) => {
                tracing::error!(transition_id = %payload.id, error = %e, "Failed to save transition");
                self.bus
                    .publish(Notification::error("Error saving transition", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Create a transition, then wire its destination and source states.
    ///
    /// Creation ignores the destination and sources, so they are attached
    /// with a follow-up update. If that update fails the transition exists
    /// unconnected and the error is returned.
    pub async fn add_transition(&self, spec: NewTransitionSpec) -> Result<Transition, PanelError> {
        let workflow = self.loaded().await?;
        if let Err(e) = check_new_transition(&workflow, &spec) {
            self.bus
                .publish(Notification::warning("Cannot add transition", e.to_string()));
            return Err(e);
        }

        self.slots.write().await.add.start();
        let transition_id = spec.id();
        let request = NewTransition {
            title: spec.title.trim().to_string(),
            description: spec.description.trim().to_string(),
            new_state_id: spec.destination.clone(),
            initial_states: spec.source_states.clone(),
            clone_from_id: spec.clone_from.clone(),
        };

        let created = match self
            .backend
            .add_transition(&workflow.id, &transition_id, &request)
            .await
        {
            Ok(transition) => transition,
            Err(e) => {
                tracing::error!(workflow_id = %workflow.id, error = %e, "Failed to add transition");
                self.slots.write().await.add = OpStatus::Failure(e.user_message());
                self.bus
                    .publish(Notification::error("Error adding transition", e.user_message()));
                return Err(e.into());
            }
        };
        tracing::info!(
            workflow_id = %workflow.id,
            transition_id = %created.id,
            "Transition added",
        );

        if let Some(changes) = connect_body(&spec) {
            if let Err(e) = self
                .backend
                .update_transition(&workflow.id, &created.id, &changes)
                .await
            {
                tracing::error!(
                    transition_id = %created.id,
                    error = %e,
                    "Failed to connect new transition",
                );
                self.slots.write().await.add = OpStatus::Failure(e.user_message());
                self.bus.publish(Notification::error(
                    "Error connecting transition",
                    e.user_message(),
                ));
                self.reload_after_mutation(&workflow.id).await;
                return Err(e.into());
            }
        }

        self.slots.write().await.add = OpStatus::Success(created.id.clone());
        self.bus.publish(Notification::success(
            "Transition created",
            format!("Transition '{}' was added.", request.title),
        ));
        self.reload_after_mutation(&workflow.id).await;
        Ok(created)
    }

    /// Delete `transition_id` and drop it from every state that fires it.
    pub async fn delete_transition(&self, transition_id: &str) -> Result<(), PanelError> {
        let workflow = self.loaded().await?;
        if workflow.transition(transition_id).is_none() {
            let e = not_found("transition", transition_id);
            self.bus
                .publish(Notification::warning("Cannot delete transition", e.to_string()));
            return Err(e);
        }

        self.slots.write().await.delete.start();
        let result = self
            .backend
            .delete_transition(&workflow.id, transition_id)
            .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    workflow_id = %workflow.id,
                    transition_id = %transition_id,
                    "Transition deleted",
                );
                self.slots.write().await.delete = OpStatus::Success(transition_id.to_string());
                if self.buffer.selected_id().await.as_deref() == Some(transition_id) {
                    self.buffer.clear().await;
                }
                self.bus.publish(Notification::success(
                    "Transition deleted",
                    format!("Transition '{transition_id}' was deleted."),
                ));
                self.reload_after_mutation(&workflow.id).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(transition_id = %transition_id, error = %e, "Failed to delete transition");
                self.slots.write().await.delete = OpStatus::Failure(e.user_message());
                self.bus
                    .publish(Notification::error("Error deleting transition", e.user_message()));
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
            Err(e) => tracing::warn!(error = %e, "Reload after transition change failed"),
        }
    }
}

fn local_draft(workflow: &Workflow, transition_id: &str, sources: &[StateId]) -> Option<TransitionDraft> {
    workflow
        .transition(transition_id)
        .map(|transition| TransitionDraft::from_transition(transition, sources))
}

fn check_new_transition(workflow: &Workflow, spec: &NewTransitionSpec) -> Result<(), PanelError> {
    validate_title(&spec.title, workflow.transition_titles(), None)?;

    if let Some(destination) = spec.destination.as_deref() {
        if workflow.state(destination).is_none() {
            return Err(not_found("state", destination));
        }
    }
    if let Some(missing) = spec
        .source_states
        .iter()
        .find(|id| workflow.state(id).is_none())
    {
        return Err(not_found("state", missing));
    }
    if let Some(source) = spec.clone_from.as_deref() {
        if workflow.transition(source).is_none() {
            return Err(not_found("transition", source));
        }
    }
    Ok(())
}

/// The update that links a freshly created transition, or `None` when the
/// request names neither a destination nor sources.
fn connect_body(spec: &NewTransitionSpec) -> Option<Value> {
    let mut body = Map::new();
    if let Some(destination) = &spec.destination {
        body.insert("new_state_id".into(), json!(destination));
    }
    if !spec.source_states.is_empty() {
        body.insert(
            "states_with_this_transition".into(),
            json!(spec.source_states),
        );
    }
    (!body.is_empty()).then_some(Value::Object(body))
}
