//! Editors for the loaded workflow, its states, and its transitions.
//!
//! Each editor wraps an [`EditSession`] in a [`DraftBuffer`] and issues a
//! single PATCH per save, then reloads the detail store so the baseline
//! reflects the server. A failed save leaves the draft in place for the
//! user to correct and resubmit.

mod state;
mod transition;
mod workflow;

pub use state::{StateEditor, StateOptions};
pub use transition::{NewTransitionSpec, TransitionEditor, TransitionOptions};
pub use workflow::WorkflowEditor;

use std::collections::BTreeSet;

use tokio::sync::RwLock;

use wfm_client::ApiError;
use wfm_core::drafts::Draft;
use wfm_core::session::{EditSession, SavePayload};

use crate::error::PanelError;
use crate::ops::OpStatus;

#[derive(Debug)]
struct BufferState<D: Draft> {
    session: EditSession<D>,
    /// A dirty draft pushed out by a server refresh, waiting for the caller
    /// to restore or discard it.
    displaced: Option<D>,
    update: OpStatus<()>,
}

/// Shared draft handling for the three editors.
#[derive(Debug)]
pub struct DraftBuffer<D: Draft> {
    state: RwLock<BufferState<D>>,
}

impl<D: Draft> Default for DraftBuffer<D> {
    fn default() -> Self {
        Self {
            state: RwLock::new(BufferState {
                session: EditSession::new(),
                displaced: None,
                update: OpStatus::Idle,
            }),
        }
    }
}

impl<D: Draft> DraftBuffer<D> {
    pub async fn selected_id(&self) -> Option<String> {
        self.state.read().await.session.selected_id().map(str::to_string)
    }

    pub async fn draft(&self) -> Option<D> {
        self.state.read().await.session.draft().cloned()
    }

    pub async fn baseline(&self) -> Option<D> {
        self.state.read().await.session.baseline().cloned()
    }

    pub async fn is_disabled(&self) -> bool {
        self.state.read().await.session.is_disabled()
    }

    pub async fn is_dirty(&self) -> bool {
        self.state.read().await.session.is_dirty()
    }

    pub async fn is_saving(&self) -> bool {
        self.state.read().await.session.is_saving()
    }

    pub async fn pending_payload(&self) -> Option<SavePayload> {
        self.state.read().await.session.pending_payload()
    }

    pub async fn changed_tabs(&self) -> BTreeSet<D::Tab> {
        self.state.read().await.session.changed_tabs()
    }

    pub async fn update_status(&self) -> OpStatus<()> {
        self.state.read().await.update.clone()
    }

    /// Merge an edit into the draft. Refused while nothing is selected.
    pub async fn edit<F>(&self, edit: F) -> Result<(), PanelError>
    where
        F: FnOnce(&mut D),
    {
        self.state.write().await.session.update(edit)?;
        Ok(())
    }

    /// The dirty draft a refresh displaced, if any.
    pub async fn displaced(&self) -> Option<D> {
        self.state.read().await.displaced.clone()
    }

    /// Reapply the displaced draft on top of the refreshed baseline.
    /// Returns `false` when there was nothing to restore.
    pub async fn restore_displaced(&self) -> Result<bool, PanelError> {
        let mut state = self.state.write().await;
        match state.displaced.take() {
            Some(draft) => {
                state.session.restore_draft(draft)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn discard_displaced(&self) {
        self.state.write().await.displaced = None;
    }

    pub(crate) async fn select(&self, id: &str, snapshot: D) {
        let mut state = self.state.write().await;
        state.session.select(id, snapshot);
        state.displaced = None;
        state.update.reset();
    }

    pub(crate) async fn clear(&self) {
        let mut state = self.state.write().await;
        state.session.clear();
        state.displaced = None;
    }

    /// Apply a server snapshot for `id` if it is still selected. Server
    /// wins; a dirty draft is kept aside as [`displaced`](Self::displaced).
    /// `None` means the entity no longer exists.
    pub(crate) async fn sync(&self, id: &str, snapshot: Option<D>) {
        let mut state = self.state.write().await;
        if state.session.selected_id() != Some(id) {
            return;
        }
        match snapshot {
            Some(snapshot) => {
                if let Some(previous) = state.session.refresh(snapshot) {
                    tracing::info!(id = %id, "Unsaved draft displaced by server refresh");
                    state.displaced = Some(previous);
                }
            }
            None => {
                state.session.clear();
                state.displaced = None;
            }
        }
    }

    /// Reset `id` to a freshly saved snapshot if it is still selected.
    pub(crate) async fn reselect(&self, id: &str, snapshot: Option<D>) {
        let mut state = self.state.write().await;
        if state.session.selected_id() != Some(id) {
            return;
        }
        match snapshot {
            Some(snapshot) => state.session.select(id, snapshot),
            None => state.session.clear(),
        }
    }

    pub(crate) async fn begin_save(&self) -> Result<Option<SavePayload>, PanelError> {
        let mut state = self.state.write().await;
        let payload = state.session.begin_save()?;
        if payload.is_some() {
            state.update.start();
        }
        Ok(payload)
    }

    pub(crate) async fn finish_save(&self, result: &Result<(), ApiError>) {
        let mut state = self.state.write().await;
        state.session.finish_save();
        state.update = match result {
            Ok(()) => OpStatus::Success(()),
            Err(e) => OpStatus::Failure(e.user_message()),
        };
    }
}
