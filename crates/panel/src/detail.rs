//! The detail store: the full definition of the workflow being edited.
//!
//! One workflow is loaded at a time. Loading fetches the state and
//! transition lists concurrently and assembles them with the catalog
//! summary; the server copy always replaces whatever was held before. The
//! reverse [`SourceIndex`] is rebuilt on every load.
//!
//! Highlights set through [`DetailStore::highlight_state`] and
//! [`DetailStore::highlight_transition`] clear themselves after
//! [`HIGHLIGHT_WINDOW`] on a spawned timer. Timers die with the store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use wfm_client::WorkflowBackend;
use wfm_core::error::CoreError;
use wfm_core::graph::{project, Highlight, HighlightTracker, Projection, SourceIndex, HIGHLIGHT_WINDOW};
use wfm_core::model::{Workflow, WorkflowSummary};
use wfm_core::types::{StateId, WorkflowId};

use crate::error::PanelError;
use crate::notify::{Notification, NotificationBus};
use crate::ops::OpStatus;
use crate::requests::{EntityKind, RequestKey, RequestTracker};

#[derive(Debug, Default)]
struct DetailState {
    /// Workflow most recently asked for; completions for others are dropped.
    selected: Option<WorkflowId>,
    workflow: Option<Workflow>,
    index: SourceIndex,
    highlight: HighlightTracker,
    load: OpStatus<()>,
    security: OpStatus<u64>,
    assign: OpStatus<String>,
}

pub struct DetailStore<B> {
    backend: Arc<B>,
    bus: Arc<NotificationBus>,
    requests: Arc<RequestTracker>,
    state: Arc<RwLock<DetailState>>,
    /// Parent of every highlight timer.
    timers: CancellationToken,
}

impl<B: WorkflowBackend> DetailStore<B> {
    pub fn new(backend: Arc<B>, bus: Arc<NotificationBus>, requests: Arc<RequestTracker>) -> Self {
        Self {
            backend,
            bus,
            requests,
            state: Arc::new(RwLock::new(DetailState::default())),
            timers: CancellationToken::new(),
        }
    }

    // ---- loading ----

    /// Load the full definition for `summary`'s workflow.
    ///
    /// Fails with [`PanelError::Superseded`] if another load started while
    /// this one was in flight; the newer load's result is the one kept.
    pub async fn load(&self, summary: WorkflowSummary) -> Result<Workflow, PanelError> {
        let workflow_id = summary.id.clone();
        let ticket = self
            .requests
            .begin(RequestKey::new(EntityKind::Workflow, workflow_id.as_str()));
        {
            let mut state = self.state.write().await;
            if state.workflow.as_ref().is_some_and(|w| w.id != workflow_id) {
                tracing::debug!(workflow_id = %workflow_id, "Switching workflow, dropping held definition");
                state.workflow = None;
                state.index = SourceIndex::default();
                state.highlight.clear();
            }
            state.selected = Some(workflow_id.clone());
            state.load.start();
        }

        let result = futures::try_join!(
            self.backend.list_states(&workflow_id),
            self.backend.list_transitions(&workflow_id),
        );

        let mut state = self.state.write().await;
        if !self.requests.finish(&ticket) || state.selected.as_deref() != Some(workflow_id.as_str()) {
            tracing::debug!(workflow_id = %workflow_id, "Dropping stale workflow load");
            return Err(PanelError::Superseded);
        }

        match result {
            Ok((states, transitions)) => {
                let workflow = Workflow {
                    id: summary.id,
                    title: states
                        .workflow_title
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or(summary.title),
                    description: summary.description,
                    initial_state: states.initial_state.or(summary.initial_state),
                    assigned_types: summary.assigned_types,
                    states: states.states,
                    transitions: transitions.transitions,
                    context_data: summary.context_data,
                };

                tracing::info!(
                    workflow_id = %workflow.id,
                    states = workflow.states.len(),
                    transitions = workflow.transitions.len(),
                    "Workflow loaded",
                );
                if !workflow.initial_state_resolves() {
                    tracing::warn!(workflow_id = %workflow.id, "Initial state does not resolve");
                }

                state.index = SourceIndex::build(&workflow);
                state.workflow = Some(workflow.clone());
                state.load = OpStatus::Success(());
                Ok(workflow)
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Failed to load workflow");
                state.load = OpStatus::Failure(e.user_message());
                drop(state);
                self.bus
                    .publish(Notification::error("Error loading workflow", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Reload the current workflow from the server.
    pub async fn reload(&self) -> Result<Workflow, PanelError> {
        let current = self
            .snapshot()
            .await
            .ok_or(CoreError::NotLoaded("no workflow loaded"))?;
        self.load(current).await
    }

    /// Forget the loaded workflow (e.g. after it was deleted).
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = DetailState::default();
    }

    // ---- reads ----

    pub async fn snapshot(&self) -> Option<Workflow> {
        self.state.read().await.workflow.clone()
    }

    pub async fn workflow_id(&self) -> Option<WorkflowId> {
        self.state
            .read()
            .await
            .workflow
            .as_ref()
            .map(|w| w.id.clone())
    }

    pub async fn source_index(&self) -> SourceIndex {
        self.state.read().await.index.clone()
    }

    /// States that fire `transition_id`, from the index.
    pub async fn sources_of(&self, transition_id: &str) -> Vec<StateId> {
        self.state.read().await.index.sources_of(transition_id).to_vec()
    }

    pub async fn load_status(&self) -> OpStatus<()> {
        self.state.read().await.load.clone()
    }

    pub async fn security_status(&self) -> OpStatus<u64> {
        self.state.read().await.security.clone()
    }

    pub async fn assign_status(&self) -> OpStatus<String> {
        self.state.read().await.assign.clone()
    }

    /// Highlights still inside their window.
    pub async fn highlight(&self) -> Highlight {
        let now = Instant::now().into_std();
        self.state.read().await.highlight.current(now)
    }

    /// Graph view of the loaded workflow with current highlights.
    pub async fn projection(&self) -> Option<Projection> {
        let now = Instant::now().into_std();
        let state = self.state.read().await;
        let workflow = state.workflow.as_ref()?;
        Some(project(workflow, &state.highlight.current(now)))
    }

    // ---- highlight ----

    /// Flash a state in the graph.
    pub async fn highlight_state(&self, state_id: &str) -> Result<(), PanelError> {
        {
            let mut state = self.state.write().await;
            let workflow = state
                .workflow
                .as_ref()
                .ok_or(CoreError::NotLoaded("no workflow loaded"))?;
            if workflow.state(state_id).is_none() {
                return Err(not_found("state", state_id));
            }
            state
                .highlight
                .highlight_state(state_id, Instant::now().into_std());
        }
        self.schedule_highlight_clear();
        Ok(())
    }

    /// Flash every edge of a transition in the graph.
    pub async fn highlight_transition(&self, transition_id: &str) -> Result<(), PanelError> {
        {
            let mut state = self.state.write().await;
            let workflow = state
                .workflow
                .as_ref()
                .ok_or(CoreError::NotLoaded("no workflow loaded"))?;
            if workflow.transition(transition_id).is_none() {
                return Err(not_found("transition", transition_id));
            }
            state
                .highlight
                .highlight_transition(transition_id, Instant::now().into_std());
        }
        self.schedule_highlight_clear();
        Ok(())
    }

    fn schedule_highlight_clear(&self) {
        let state = Arc::clone(&self.state);
        let cancel = self.timers.child_token();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(HIGHLIGHT_WINDOW) => {
                    let now = Instant::now().into_std();
                    if state.write().await.highlight.clear_expired(now) {
                        tracing::debug!("Highlight cleared");
                    }
                }
            }
        });
    }

    // ---- workflow-level actions ----

    /// Recompute role mappings on existing content after security edits.
    /// Returns the number of objects updated when the backend reports it.
    pub async fn update_security(&self) -> Result<u64, PanelError> {
        let workflow_id = self.require_loaded().await?;
        self.state.write().await.security.start();

        let result = self.backend.update_security(&workflow_id).await;
        let mut state = self.state.write().await;
        match result {
            Ok(reply) => {
                let count = reply.count.unwrap_or(0);
                tracing::info!(workflow_id = %workflow_id, count, "Security settings updated");
                state.security = OpStatus::Success(count);
                drop(state);
                let message = if reply.message.is_empty() {
                    format!("Updated {count} objects.")
                } else {
                    reply.message
                };
                self.bus
                    .publish(Notification::success("Security updated", message));
                Ok(count)
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Failed to update security");
                state.security = OpStatus::Failure(e.user_message());
                drop(state);
                self.bus
                    .publish(Notification::error("Error updating security", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Make the loaded workflow the one used by content type `type_id`.
    pub async fn assign_type(&self, type_id: &str) -> Result<(), PanelError> {
        let workflow_id = self.require_loaded().await?;
        let type_id = type_id.trim();
        if type_id.is_empty() {
            return Err(CoreError::Validation("a content type is required".into()).into());
        }
        self.state.write().await.assign.start();

        let result = self.backend.assign_type(&workflow_id, type_id).await;
        let mut state = self.state.write().await;
        match result {
            Ok(_) => {
                tracing::info!(workflow_id = %workflow_id, type_id = %type_id, "Workflow assigned");
                state.assign = OpStatus::Success(type_id.to_string());
                if let Some(workflow) = state.workflow.as_mut().filter(|w| w.id == workflow_id) {
                    if !workflow.assigned_types.iter().any(|t| t == type_id) {
                        workflow.assigned_types.push(type_id.to_string());
                    }
                }
                drop(state);
                self.bus.publish(Notification::success(
                    "Workflow assigned",
                    format!("'{type_id}' now uses workflow '{workflow_id}'."),
                ));
                Ok(())
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Failed to assign workflow");
                state.assign = OpStatus::Failure(e.user_message());
                drop(state);
                self.bus
                    .publish(Notification::error("Error assigning workflow", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Stop highlight timers and forget highlights.
    pub async fn teardown(&self) {
        self.timers.cancel();
        self.state.write().await.highlight.clear();
    }

    async fn require_loaded(&self) -> Result<WorkflowId, PanelError> {
        self.workflow_id()
            .await
            .ok_or_else(|| CoreError::NotLoaded("no workflow loaded").into())
    }
}

impl<B> Drop for DetailStore<B> {
    fn drop(&mut self) {
        self.timers.cancel();
    }
}

pub(crate) fn not_found(entity: &'static str, id: &str) -> PanelError {
    CoreError::NotFound {
        entity,
        id: id.to_string(),
    }
    .into()
}
