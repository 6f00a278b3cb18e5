//! The backend operations the panel depends on.

use async_trait::async_trait;
use serde_json::Value;

use wfm_core::model::{State, Transition, WorkflowSummary};
use wfm_core::report::ValidationReport;

use crate::error::ApiError;
use crate::messages::{
    AssignTypeReply, CreateWorkflowReply, NewState, NewTransition, SecurityUpdateReply,
    StateDetails, StateList, TransitionDetails, TransitionList,
};

/// One method per row of the backend REST contract.
///
/// Update methods take the changed fields as a JSON object; the entity id
/// travels in the path.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, ApiError>;

    async fn create_workflow(
        &self,
        clone_from: &str,
        name: &str,
    ) -> Result<CreateWorkflowReply, ApiError>;

    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), ApiError>;

    async fn update_workflow(&self, workflow_id: &str, changes: &Value) -> Result<(), ApiError>;

    async fn update_security(&self, workflow_id: &str) -> Result<SecurityUpdateReply, ApiError>;

    async fn assign_type(
        &self,
        workflow_id: &str,
        type_id: &str,
    ) -> Result<AssignTypeReply, ApiError>;

    async fn sanity_check(&self, workflow_id: &str) -> Result<ValidationReport, ApiError>;

    async fn list_states(&self, workflow_id: &str) -> Result<StateList, ApiError>;

    async fn get_state(&self, workflow_id: &str, state_id: &str) -> Result<StateDetails, ApiError>;

    async fn add_state(&self, workflow_id: &str, state: &NewState) -> Result<State, ApiError>;

    async fn update_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError>;

    async fn delete_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        replacement_state_id: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn list_transitions(&self, workflow_id: &str) -> Result<TransitionList, ApiError>;

    async fn get_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
    ) -> Result<TransitionDetails, ApiError>;

    async fn add_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        transition: &NewTransition,
    ) -> Result<Transition, ApiError>;

    async fn update_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError>;

    async fn delete_transition(&self, workflow_id: &str, transition_id: &str)
        -> Result<(), ApiError>;
}
