//! Headless state layer of the workflow manager control panel.
//!
//! The stores here hold what the panel shows and drive every backend call:
//!
//! - [`catalog::CatalogStore`]: the workflow list with create, rename, and
//!   delete.
//! - [`detail::DetailStore`]: the full definition of the open workflow, its
//!   graph projection, and highlight timers.
//! - [`editor`]: draft sessions for the workflow, a state, and a transition.
//! - [`validation::ValidationRunner`]: backend sanity checks.
//!
//! All stores are generic over [`WorkflowBackend`] and share one
//! [`NotificationBus`] and one [`RequestTracker`]. [`Panel`] wires them
//! together.

pub mod catalog;
pub mod config;
pub mod detail;
pub mod editor;
pub mod error;
pub mod notify;
pub mod ops;
pub mod requests;
pub mod route;
pub mod validation;

use std::sync::Arc;

use wfm_client::WorkflowBackend;
use wfm_core::model::Workflow;

use crate::catalog::CatalogStore;
use crate::detail::{not_found, DetailStore};
use crate::editor::{StateEditor, TransitionEditor, WorkflowEditor};
use crate::error::PanelError;
use crate::notify::NotificationBus;
use crate::requests::RequestTracker;
use crate::route::PanelRoute;
use crate::validation::ValidationRunner;

/// Every store of the panel, sharing one backend.
pub struct Panel<B> {
    pub bus: Arc<NotificationBus>,
    pub requests: Arc<RequestTracker>,
    pub catalog: Arc<CatalogStore<B>>,
    pub detail: Arc<DetailStore<B>>,
    pub workflow_editor: WorkflowEditor<B>,
    pub state_editor: StateEditor<B>,
    pub transition_editor: TransitionEditor<B>,
    pub validation: Arc<ValidationRunner<B>>,
}

impl<B: WorkflowBackend> Panel<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let bus = Arc::new(NotificationBus::default());
        let requests = Arc::new(RequestTracker::default());
        let detail = Arc::new(DetailStore::new(
            Arc::clone(&backend),
            Arc::clone(&bus),
            Arc::clone(&requests),
        ));
        let catalog = Arc::new(CatalogStore::new(
            Arc::clone(&backend),
            Arc::clone(&bus),
            Arc::clone(&requests),
        ));
        let validation = Arc::new(ValidationRunner::new(
            Arc::clone(&backend),
            Arc::clone(&bus),
            Arc::clone(&requests),
        ));

        Self {
            workflow_editor: WorkflowEditor::new(
                Arc::clone(&backend),
                Arc::clone(&bus),
                Arc::clone(&detail),
                Arc::clone(&catalog),
            ),
            state_editor: StateEditor::new(
                Arc::clone(&backend),
                Arc::clone(&bus),
                Arc::clone(&detail),
                Arc::clone(&requests),
                Arc::clone(&validation),
            ),
            transition_editor: TransitionEditor::new(
                backend,
                Arc::clone(&bus),
                Arc::clone(&detail),
                Arc::clone(&requests),
                Arc::clone(&validation),
            ),
            catalog,
            validation,
            detail,
            bus,
            requests,
        }
    }

    /// Open `workflow_id`: find its catalog entry (refreshing the catalog
    /// if needed), load the full definition, and start editing its
    /// properties. Switching workflows drops every editor selection first.
    pub async fn open(&self, workflow_id: &str) -> Result<Workflow, PanelError> {
        let summary = match self.catalog.summary(workflow_id).await {
            Some(summary) => summary,
            None => {
                self.catalog.refresh().await?;
                self.catalog
                    .summary(workflow_id)
                    .await
                    .ok_or_else(|| not_found("workflow", workflow_id))?
            }
        };

        if self.detail.workflow_id().await.as_deref() != Some(workflow_id) {
            self.workflow_editor.buffer().clear().await;
            self.state_editor.buffer().clear().await;
            self.transition_editor.buffer().clear().await;
        }

        let workflow = self.detail.load(summary).await?;
        self.workflow_editor.select_current().await?;
        Ok(workflow)
    }

    /// Apply a panel location. Returns the opened workflow, or `None` for
    /// the bare catalog.
    pub async fn open_route(&self, route: &PanelRoute) -> Result<Option<Workflow>, PanelError> {
        match &route.workflow {
            Some(id) => self.open(id).await.map(Some),
            None => {
                self.catalog.refresh().await?;
                Ok(None)
            }
        }
    }

    /// The location matching what is open right now.
    pub async fn route(&self) -> PanelRoute {
        PanelRoute {
            workflow: self.detail.workflow_id().await,
        }
    }

    /// Cancel in-flight requests and highlight timers.
    pub async fn shutdown(&self) {
        self.requests.shutdown();
        self.detail.teardown().await;
        tracing::debug!("Panel shut down");
    }
}
