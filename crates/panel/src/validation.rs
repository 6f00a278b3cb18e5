//! Backend sanity checks, one outcome per workflow.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use wfm_client::WorkflowBackend;
use wfm_core::report::{ValidationOutcome, ValidationReport};
use wfm_core::types::WorkflowId;

use crate::error::PanelError;
use crate::notify::{Notification, NotificationBus};
use crate::requests::{EntityKind, RequestKey, RequestTracker};

pub struct ValidationRunner<B> {
    backend: Arc<B>,
    bus: Arc<NotificationBus>,
    requests: Arc<RequestTracker>,
    outcomes: RwLock<HashMap<WorkflowId, ValidationOutcome>>,
}

impl<B: WorkflowBackend> ValidationRunner<B> {
    pub fn new(backend: Arc<B>, bus: Arc<NotificationBus>, requests: Arc<RequestTracker>) -> Self {
        Self {
            backend,
            bus,
            requests,
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    /// Ask the backend to check `workflow_id` for unreachable states,
    /// unused transitions, and a missing initial state.
    pub async fn run(&self, workflow_id: &str) -> Result<ValidationReport, PanelError> {
        let ticket = self
            .requests
            .begin(RequestKey::new(EntityKind::Validation, workflow_id));
        self.outcomes
            .write()
            .await
            .insert(workflow_id.to_string(), ValidationOutcome::Running);

        let result = self.backend.sanity_check(workflow_id).await;
        if !self.requests.finish(&ticket) {
            tracing::debug!(workflow_id = %workflow_id, "Dropping stale sanity check");
            return Err(PanelError::Superseded);
        }

        match result {
            Ok(report) => {
                tracing::info!(
                    workflow_id = %workflow_id,
                    issues = report.issue_count(),
                    "Sanity check complete",
                );
                self.outcomes.write().await.insert(
                    workflow_id.to_string(),
                    ValidationOutcome::Complete(report.clone()),
                );
                let notification = if report.is_clean() {
                    Notification::success("Sanity check passed", "No validation errors found.")
                } else {
                    Notification::warning(
                        "Sanity check found problems",
                        format!("{} issue(s) found.", report.issue_count()),
                    )
                };
                self.bus.publish(notification);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(workflow_id = %workflow_id, error = %e, "Sanity check failed");
                self.outcomes.write().await.insert(
                    workflow_id.to_string(),
                    ValidationOutcome::Failed(e.user_message()),
                );
                self.bus
                    .publish(Notification::error("Error running sanity check", e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Last outcome for `workflow_id`; [`ValidationOutcome::NotRun`] until a
    /// check has been started.
    pub async fn outcome(&self, workflow_id: &str) -> ValidationOutcome {
        self.outcomes
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget the outcome for `workflow_id` (e.g. after an edit).
    pub async fn invalidate(&self, workflow_id: &str) {
        self.outcomes.write().await.remove(workflow_id);
    }
}
