use std::sync::Arc;

use wfm_client::WorkflowBackend;
use wfm_core::drafts::WorkflowDraft;
use wfm_core::error::CoreError;
use wfm_core::titles::validate_title;

use super::DraftBuffer;
use crate::catalog::CatalogStore;
use crate::detail::DetailStore;
use crate::error::PanelError;
use crate::notify::{Notification, NotificationBus};

/// Edits the loaded workflow's title and description.
///
/// Titles are checked against the catalog, the workflow's siblings.
pub struct WorkflowEditor<B> {
    backend: Arc<B>,
    bus: Arc<NotificationBus>,
    detail: Arc<DetailStore<B>>,
    catalog: Arc<CatalogStore<B>>,
    buffer: DraftBuffer<WorkflowDraft>,
}

impl<B: WorkflowBackend> WorkflowEditor<B> {
    pub fn new(
        backend: Arc<B>,
        bus: Arc<NotificationBus>,
        detail: Arc<DetailStore<B>>,
        catalog: Arc<CatalogStore<B>>,
    ) -> Self {
        Self {
            backend,
            bus,
            detail,
            catalog,
            buffer: DraftBuffer::default(),
        }
    }

    pub fn buffer(&self) -> &DraftBuffer<WorkflowDraft> {
        &self.buffer
    }

    /// Start editing the workflow currently held by the detail store.
    pub async fn select_current(&self) -> Result<(), PanelError> {
        let workflow = self
            .detail
            .snapshot()
            .await
            .ok_or(CoreError::NotLoaded("no workflow loaded"))?;
        self.buffer
            .select(&workflow.id, WorkflowDraft::from_workflow(&workflow))
            .await;
        Ok(())
    }

    /// Pull the detail store's copy into the session (server wins).
    pub async fn sync(&self) {
        if let Some(id) = self.buffer.selected_id().await {
            let snapshot = self
                .detail
                .snapshot()
                .await
                .filter(|w| w.id == id)
                .map(|w| WorkflowDraft::from_workflow(&w));
            self.buffer.sync(&id, snapshot).await;
        }
    }

    /// Send the pending changes. Returns `false` when there was nothing to
    /// save.
    pub async fn save(&self) -> Result<bool, PanelError> {
        let Some(draft) = self.buffer.draft().await else {
            return Err(CoreError::NotLoaded("no workflow selected").into());
        };
        let Some(pending) = self.buffer.pending_payload().await else {
            return Ok(false);
        };
        if pending.contains("title") {
            let siblings = self.catalog.workflows().await;
            let checked = validate_title(
                &draft.title,
                siblings.iter().map(|w| (w.id.as_str(), w.title.as_str())),
                Some(pending.id.as_str()),
            );
            if let Err(e) = checked {
                self.bus
                    .publish(Notification::warning("Cannot save workflow", e.to_string()));
                return Err(e.into());
            }
        }

        let Some(payload) = self.buffer.begin_save().await? else {
            return Ok(false);
        };
        let result = self
            .backend
            .update_workflow(&payload.id, &payload.body())
            .await;
        self.buffer.finish_save(&result).await;

        match result {
            Ok(()) => {
                tracing::info!(workflow_id = %payload.id, "Workflow properties saved");
                self.bus.publish(Notification::success(
                    "Workflow saved",
                    "Workflow properties were updated.",
                ));
                if let Ok(fresh) = self.detail.reload().await {
                    self.buffer
                        .reselect(&payload.id, Some(WorkflowDraft::from_workflow(&fresh)))
                        .await;
                }
                if payload.contains("title") {
                    if let Err(e) = self.catalog.refresh().await {
                        tracing::warn!(error = %e, "Catalog refresh after rename failed");
                    }
                }
                Ok(true)
            }
            Err(e) => {
                tracing::error!(workflow_id = %payload.id, error = %e, "Failed to save workflow");
                self.bus
                    .publish(Notification::error("Error saving workflow", e.user_message()));
                Err(e.into())
            }
        }
    }
}
