//! Request and response bodies for the workflow-manager endpoints.
//!
//! Responses are parsed leniently: fields the backend sometimes omits
//! default to empty, and unknown fields are ignored.

use serde::{Deserialize, Serialize};

use wfm_core::model::{GroupInfo, PermissionInfo, State, Transition, WorkflowSummary};
use wfm_core::report::ValidationReport;
use wfm_core::types::{StateId, TransitionId, WorkflowId};

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// The `{status, message}` acknowledgement most mutating calls return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// `{id, title}` pair used by the pick lists in detail responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowList {
    #[serde(default)]
    pub workflows: Vec<WorkflowSummary>,
}

/// Body of `POST /@workflows`. Every new workflow is a clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateWorkflowRequest {
    #[serde(rename = "clone-from-workflow")]
    pub clone_from: WorkflowId,
    #[serde(rename = "workflow-name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateWorkflowReply {
    #[serde(default)]
    pub status: String,
    /// Id the backend assigned; absent on older backends.
    #[serde(default)]
    pub workflow_id: Option<WorkflowId>,
    #[serde(default)]
    pub message: String,
}

/// Body of `PATCH /@workflows/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateWorkflowRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecurityUpdateReply {
    #[serde(default)]
    pub status: String,
    /// Number of content objects whose role mappings were recomputed.
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignTypeRequest {
    pub type_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssignTypeReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub workflow: Option<WorkflowId>,
    #[serde(default, rename = "type")]
    pub type_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// `GET /@workflows/{id}/@sanity-check`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SanityCheckReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub workflow: Option<WorkflowId>,
    #[serde(default)]
    pub errors: ValidationReport,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateList {
    #[serde(default)]
    pub workflow_id: Option<WorkflowId>,
    #[serde(default)]
    pub workflow_title: Option<String>,
    #[serde(default)]
    pub initial_state: Option<StateId>,
    #[serde(default)]
    pub states: Vec<State>,
}

/// `GET /@workflows/{wf}/@states/{id}`: the state plus form reference data.
#[derive(Debug, Clone, Deserialize)]
pub struct StateDetails {
    pub state: State,
    #[serde(default)]
    pub is_initial_state: bool,
    #[serde(default)]
    pub available_transitions: Vec<EntityRef>,
    #[serde(default)]
    pub available_states: Vec<EntityRef>,
    #[serde(default)]
    pub managed_permissions: Vec<PermissionInfo>,
    #[serde(default)]
    pub available_roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<GroupInfo>,
}

/// Body of `POST /@workflows/{wf}/@states`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewState {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_from_id: Option<StateId>,
}

/// Body of `DELETE /@workflows/{wf}/@states/{id}`. The backend requires a
/// replacement when the state is some transition's destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteStateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_state_id: Option<StateId>,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitionList {
    #[serde(default)]
    pub workflow_id: Option<WorkflowId>,
    #[serde(default)]
    pub workflow_title: Option<String>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// A guard permission option: a bare name or a full permission record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PermissionOption {
    Name(String),
    Info(PermissionInfo),
}

impl PermissionOption {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Info(info) => &info.perm,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuardOptions {
    #[serde(default)]
    pub permissions: Vec<PermissionOption>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub groups: Vec<GroupInfo>,
}

/// `GET /@transitions/{wf}/{id}`: the transition plus form reference data.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionDetails {
    pub transition: Transition,
    #[serde(default)]
    pub states_with_this_transition: Vec<StateId>,
    #[serde(default)]
    pub available_states: Vec<EntityRef>,
    #[serde(default)]
    pub available_transitions: Vec<EntityRef>,
    #[serde(default)]
    pub guard_options: GuardOptions,
}

/// Body of `POST /@transitions/{wf}/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NewTransition {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_state_id: Option<StateId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub initial_states: Vec<StateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_from_id: Option<TransitionId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_uses_dashed_keys() {
        let body = CreateWorkflowRequest {
            clone_from: "simple_publication_workflow".into(),
            name: "test-workflow-x".into(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "clone-from-workflow": "simple_publication_workflow",
                "workflow-name": "test-workflow-x"
            })
        );
    }

    #[test]
    fn sanity_check_reply_parses_errors() {
        let reply: SanityCheckReply = serde_json::from_value(json!({
            "status": "error",
            "workflow": "wf",
            "errors": {
                "state_errors": [],
                "transition_errors": [{"id": "t", "title": "T", "error": "Transition is not used by any state"}],
                "initial_state_error": false
            },
            "message": "Workflow validation complete"
        }))
        .unwrap();
        assert_eq!(reply.errors.transition_errors.len(), 1);
        assert!(!reply.errors.initial_state_error);
    }

    #[test]
    fn new_state_omits_unset_fields() {
        let body = NewState {
            title: "Draft Review".into(),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"title": "Draft Review"}));
    }

    #[test]
    fn guard_permission_options_accept_both_shapes() {
        let options: GuardOptions = serde_json::from_value(json!({
            "permissions": ["Review portal content", {"perm": "View", "name": "View"}]
        }))
        .unwrap();
        let names: Vec<&str> = options.permissions.iter().map(PermissionOption::name).collect();
        assert_eq!(names, ["Review portal content", "View"]);
    }
}
