#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use wfm_client::messages::{
    AssignTypeReply, CreateWorkflowReply, EntityRef, GuardOptions, NewState, NewTransition,
    PermissionOption, SecurityUpdateReply, StateDetails, StateList, TransitionDetails,
    TransitionList,
};
use wfm_client::{ApiError, WorkflowBackend};
use wfm_core::model::{GroupInfo, PermissionInfo, State, Transition, TriggerType, Workflow};
use wfm_core::naming::{slugify, workflow_id_from_name};
use wfm_core::report::{ValidationIssue, ValidationReport};
use wfm_panel::Panel;

pub const SIMPLE: &str = "simple_publication_workflow";
pub const INTRANET: &str = "intranet_workflow";

/// In-memory stand-in for the CMS backend, following its rules for ids,
/// conflicts, partial updates, and sanity checks.
#[derive(Default)]
pub struct FakeBackend {
    workflows: Mutex<Vec<Workflow>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, (u16, String)>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeBackend {
    pub fn seeded() -> Arc<Self> {
        let backend = Self::default();
        *lock(&backend.workflows) = vec![simple_publication(), intranet()];
        Arc::new(backend)
    }

    /// Every call made so far, as `"operation target"`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    /// Make the next call of `operation` fail with `status` and `message`.
    pub fn fail_next(&self, operation: &str, status: u16, message: &str) {
        lock(&self.failures).insert(operation.to_string(), (status, message.to_string()));
    }

    /// Delay calls of `operation` on `target` (a workflow, state, or
    /// transition id).
    pub fn delay(&self, operation: &str, target: &str, by: Duration) {
        lock(&self.delays).insert(format!("{operation} {target}"), by);
    }

    pub fn workflow(&self, id: &str) -> Option<Workflow> {
        lock(&self.workflows).iter().find(|w| w.id == id).cloned()
    }

    /// Change a workflow behind the panel's back.
    pub fn mutate<F: FnOnce(&mut Workflow)>(&self, id: &str, f: F) {
        if let Some(workflow) = lock(&self.workflows).iter_mut().find(|w| w.id == id) {
            f(workflow);
        }
    }

    async fn enter(&self, operation: &str, target: &str) -> Result<(), ApiError> {
        let key = format!("{operation} {target}");
        lock(&self.calls).push(key.clone());

        let delay = lock(&self.delays).get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match lock(&self.failures).remove(operation) {
            Some((status, message)) => Err(api_error(status, &message)),
            None => Ok(()),
        }
    }

    fn with_workflow<T, F>(&self, id: &str, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Workflow) -> Result<T, ApiError>,
    {
        let mut workflows = lock(&self.workflows);
        let workflow = workflows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| api_error(404, &format!("Workflow '{id}' not found.")))?;
        f(workflow)
    }
}

#[async_trait]
impl WorkflowBackend for FakeBackend {
    async fn list_workflows(&self) -> Result<Vec<Workflow>, ApiError> {
        self.enter("list_workflows", "").await?;
        Ok(lock(&self.workflows).clone())
    }

    async fn create_workflow(
        &self,
        clone_from: &str,
        name: &str,
    ) -> Result<CreateWorkflowReply, ApiError> {
        self.enter("create_workflow", clone_from).await?;
        let mut workflows = lock(&self.workflows);
        let source = workflows
            .iter()
            .find(|w| w.id == clone_from)
            .cloned()
            .ok_or_else(|| api_error(404, &format!("Workflow '{clone_from}' not found.")))?;

        let id = workflow_id_from_name(name);
        if workflows.iter().any(|w| w.id == id) {
            return Err(api_error(409, &format!("Workflow with id '{id}' already exists.")));
        }

        workflows.push(Workflow {
            id: id.clone(),
            title: name.to_string(),
            assigned_types: Vec::new(),
            ..source
        });
        Ok(CreateWorkflowReply {
            status: "success".into(),
            workflow_id: Some(id),
            message: "Workflow created successfully".into(),
        })
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), ApiError> {
        self.enter("delete_workflow", workflow_id).await?;
        let mut workflows = lock(&self.workflows);
        let before = workflows.len();
        workflows.retain(|w| w.id != workflow_id);
        if workflows.len() == before {
            return Err(api_error(404, &format!("Workflow '{workflow_id}' not found.")));
        }
        Ok(())
    }

    async fn update_workflow(&self, workflow_id: &str, changes: &Value) -> Result<(), ApiError> {
        self.enter("update_workflow", workflow_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            if let Some(title) = changes.get("title").and_then(Value::as_str) {
                workflow.title = title.to_string();
            }
            if let Some(description) = changes.get("description").and_then(Value::as_str) {
                workflow.description = description.to_string();
            }
            Ok(())
        })
    }

    async fn update_security(&self, workflow_id: &str) -> Result<SecurityUpdateReply, ApiError> {
        self.enter("update_security", workflow_id).await?;
        self.with_workflow(workflow_id, |_| {
            Ok(SecurityUpdateReply {
                status: "success".into(),
                count: Some(3),
                message: "Updated 3 objects.".into(),
            })
        })
    }

    async fn assign_type(
        &self,
        workflow_id: &str,
        type_id: &str,
    ) -> Result<AssignTypeReply, ApiError> {
        self.enter("assign_type", workflow_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            if !workflow.assigned_types.iter().any(|t| t == type_id) {
                workflow.assigned_types.push(type_id.to_string());
            }
            Ok(AssignTypeReply {
                status: "success".into(),
                workflow: Some(workflow.id.clone()),
                type_id: Some(type_id.to_string()),
                message: "Workflow assigned".into(),
            })
        })
    }

    async fn sanity_check(&self, workflow_id: &str) -> Result<ValidationReport, ApiError> {
        self.enter("sanity_check", workflow_id).await?;
        self.with_workflow(workflow_id, |workflow| Ok(sanity_report(workflow)))
    }

    async fn list_states(&self, workflow_id: &str) -> Result<StateList, ApiError> {
        self.enter("list_states", workflow_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            Ok(StateList {
                workflow_id: Some(workflow.id.clone()),
                workflow_title: Some(workflow.title.clone()),
                initial_state: workflow.initial_state.clone(),
                states: workflow.states.clone(),
            })
        })
    }

    async fn get_state(&self, workflow_id: &str, state_id: &str) -> Result<StateDetails, ApiError> {
        self.enter("get_state", state_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            let state = workflow
                .state(state_id)
                .cloned()
                .ok_or_else(|| state_not_found(workflow_id, state_id))?;
            Ok(StateDetails {
                is_initial_state: workflow.is_initial(state_id),
                available_transitions: refs(workflow.transition_titles()),
                available_states: refs(workflow.state_titles()),
                managed_permissions: managed_permissions(),
                available_roles: roles(),
                groups: groups(),
                state,
            })
        })
    }

    async fn add_state(&self, workflow_id: &str, request: &NewState) -> Result<State, ApiError> {
        self.enter("add_state", workflow_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            let id = slugify(&request.title);
            if id.is_empty() {
                return Err(api_error(400, "A 'title' for the new state is required."));
            }
            if workflow.state(&id).is_some() {
                return Err(api_error(409, &format!("State with id '{id}' already exists.")));
            }

            let mut state = State {
                id,
                title: request.title.clone(),
                description: request.description.clone(),
                transitions: Vec::new(),
                permission_roles: BTreeMap::new(),
                group_roles: BTreeMap::new(),
            };
            if let Some(source) = request.clone_from_id.as_deref().and_then(|s| workflow.state(s)) {
                state.transitions = source.transitions.clone();
                state.permission_roles = source.permission_roles.clone();
                state.group_roles = source.group_roles.clone();
            }
            workflow.states.push(state.clone());
            Ok(state)
        })
    }

    async fn update_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError> {
        self.enter("update_state", state_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            if changes.get("is_initial_state") == Some(&Value::Bool(true)) {
                workflow.initial_state = Some(state_id.to_string());
            }
            let state = workflow
                .states
                .iter_mut()
                .find(|s| s.id == state_id)
                .ok_or_else(|| state_not_found(workflow_id, state_id))?;

            if let Some(title) = changes.get("title").and_then(Value::as_str) {
                state.title = title.to_string();
            }
            if let Some(description) = changes.get("description").and_then(Value::as_str) {
                state.description = description.to_string();
            }
            if let Some(transitions) = changes.get("transitions") {
                state.transitions = decode(transitions)?;
            }
            if let Some(permission_roles) = changes.get("permission_roles") {
                state.permission_roles = decode(permission_roles)?;
            }
            if let Some(group_roles) = changes.get("group_roles") {
                state.group_roles = decode(group_roles)?;
            }
            Ok(())
        })
    }

    async fn delete_state(
        &self,
        workflow_id: &str,
        state_id: &str,
        replacement_state_id: Option<&str>,
    ) -> Result<(), ApiError> {
        self.enter("delete_state", state_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            if workflow.state(state_id).is_none() {
                return Err(state_not_found(workflow_id, state_id));
            }

            let in_use = workflow
                .transitions
                .iter()
                .any(|t| t.destination() == Some(state_id));
            if in_use {
                let replacement = replacement_state_id
                    .filter(|r| workflow.state(r).is_some())
                    .ok_or_else(|| {
                        api_error(
                            400,
                            "This state is a destination for one or more transitions. A valid \
                             'replacement_state_id' is required in the request body.",
                        )
                    })?
                    .to_string();
                for transition in &mut workflow.transitions {
                    if transition.destination() == Some(state_id) {
                        transition.new_state_id = Some(replacement.clone());
                    }
                }
            }

            workflow.states.retain(|s| s.id != state_id);
            Ok(())
        })
    }

    async fn list_transitions(&self, workflow_id: &str) -> Result<TransitionList, ApiError> {
        self.enter("list_transitions", workflow_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            Ok(TransitionList {
                workflow_id: Some(workflow.id.clone()),
                workflow_title: Some(workflow.title.clone()),
                transitions: workflow.transitions.clone(),
            })
        })
    }

    async fn get_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
    ) -> Result<TransitionDetails, ApiError> {
        self.enter("get_transition", transition_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            let transition = workflow
                .transition(transition_id)
                .cloned()
                .ok_or_else(|| api_error(404, "Workflow or Transition not found."))?;
            Ok(TransitionDetails {
                states_with_this_transition: workflow
                    .states
                    .iter()
                    .filter(|s| s.has_transition(transition_id))
                    .map(|s| s.id.clone())
                    .collect(),
                available_states: refs(workflow.state_titles()),
                available_transitions: refs(workflow.transition_titles()),
                guard_options: GuardOptions {
                    permissions: vec![
                        PermissionOption::Name("Review portal content".into()),
                        PermissionOption::Name("Modify portal content".into()),
                    ],
                    roles: roles(),
                    groups: groups(),
                },
                transition,
            })
        })
    }

    async fn add_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        request: &NewTransition,
    ) -> Result<Transition, ApiError> {
        self.enter("add_transition", transition_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            // Ids come from the title; destination and sources are ignored
            // at creation.
            let id = slugify(&request.title);
            if id.is_empty() {
                return Err(api_error(400, "A 'title' for the new transition is required."));
            }
            if workflow.transition(&id).is_some() {
                return Err(api_error(409, &format!("Transition with id '{id}' already exists.")));
            }

            let mut transition = Transition {
                id,
                title: request.title.clone(),
                description: request.description.clone(),
                new_state_id: None,
                trigger_type: TriggerType::UserAction,
                guard: Default::default(),
            };
            if let Some(source) = request
                .clone_from_id
                .as_deref()
                .and_then(|t| workflow.transition(t))
            {
                transition.new_state_id = source.new_state_id.clone();
                transition.trigger_type = source.trigger_type;
                transition.guard = source.guard.clone();
            }
            workflow.transitions.push(transition.clone());
            Ok(transition)
        })
    }

    async fn update_transition(
        &self,
        workflow_id: &str,
        transition_id: &str,
        changes: &Value,
    ) -> Result<(), ApiError> {
        self.enter("update_transition", transition_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            let transition = workflow
                .transitions
                .iter_mut()
                .find(|t| t.id == transition_id)
                .ok_or_else(|| api_error(404, "Workflow or Transition not found."))?;

            if let Some(title) = changes.get("title").and_then(Value::as_str) {
                transition.title = title.to_string();
            }
            if let Some(description) = changes.get("description").and_then(Value::as_str) {
                transition.description = description.to_string();
            }
            if let Some(new_state_id) = changes.get("new_state_id") {
                transition.new_state_id = decode(new_state_id)?;
            }
            if let Some(trigger_type) = changes.get("trigger_type") {
                transition.trigger_type = decode(trigger_type)?;
            }
            if let Some(guard) = changes.get("guard") {
                if let Some(permissions) = guard.get("permissions") {
                    transition.guard.permissions = decode(permissions)?;
                }
                if let Some(roles) = guard.get("roles") {
                    transition.guard.roles = decode(roles)?;
                }
                if let Some(groups) = guard.get("groups") {
                    transition.guard.groups = decode(groups)?;
                }
            }

            if let Some(sources) = changes.get("states_with_this_transition") {
                let sources: Vec<String> = decode(sources)?;
                for state in &mut workflow.states {
                    let has = state.has_transition(transition_id);
                    let should = sources.iter().any(|s| *s == state.id);
                    if should && !has {
                        state.transitions.push(transition_id.to_string());
                    } else if !should && has {
                        state.transitions.retain(|t| t != transition_id);
                    }
                }
            }
            Ok(())
        })
    }

    async fn delete_transition(&self, workflow_id: &str, transition_id: &str) -> Result<(), ApiError> {
        self.enter("delete_transition", transition_id).await?;
        self.with_workflow(workflow_id, |workflow| {
            if workflow.transition(transition_id).is_none() {
                return Err(api_error(404, "Workflow or Transition not found."));
            }
            workflow.transitions.retain(|t| t.id != transition_id);
            for state in &mut workflow.states {
                state.transitions.retain(|t| t != transition_id);
            }
            Ok(())
        })
    }
}

/// Reachability rules of the backend's sanity check.
fn sanity_report(workflow: &Workflow) -> ValidationReport {
    let state_errors = workflow
        .states
        .iter()
        .filter(|state| {
            let targeted = workflow
                .transitions
                .iter()
                .any(|t| t.new_state_id.as_deref() == Some(state.id.as_str()));
            let live_initial = workflow.is_initial(&state.id) && !state.transitions.is_empty();
            !(targeted || live_initial)
        })
        .map(|state| ValidationIssue {
            id: state.id.clone(),
            title: state.title.clone(),
            error: "State is not reachable".into(),
        })
        .collect();

    let transition_errors = workflow
        .transitions
        .iter()
        .filter(|t| {
            t.destination().is_some() && !workflow.states.iter().any(|s| s.has_transition(&t.id))
        })
        .map(|t| ValidationIssue {
            id: t.id.clone(),
            title: t.title.clone(),
            error: "Transition is not used by any state".into(),
        })
        .collect();

    ValidationReport {
        state_errors,
        transition_errors,
        initial_state_error: !workflow.initial_state_resolves(),
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn simple_publication() -> Workflow {
    serde_json::from_value(json!({
        "id": SIMPLE,
        "title": "Simple Publication Workflow",
        "description": "Three states: private, pending, published.",
        "initial_state": "private",
        "assigned_types": ["Document"],
        "states": [
            {"id": "private", "title": "Private", "transitions": ["submit", "publish"],
             "permission_roles": {"View": ["Owner", "Manager"]}},
            {"id": "pending", "title": "Pending review", "transitions": ["publish", "reject", "retract"]},
            {"id": "published", "title": "Published", "transitions": ["retract", "reject"],
             "permission_roles": {"View": ["Anonymous"]}}
        ],
        "transitions": [
            {"id": "publish", "title": "Publish", "new_state_id": "published",
             "guard": {"permissions": ["Review portal content"]}},
            {"id": "reject", "title": "Send back", "new_state_id": "private"},
            {"id": "retract", "title": "Retract", "new_state_id": "private"},
            {"id": "submit", "title": "Submit for publication", "new_state_id": "pending"}
        ]
    }))
    .expect("fixture parses")
}

pub fn intranet() -> Workflow {
    serde_json::from_value(json!({
        "id": INTRANET,
        "title": "Intranet Workflow",
        "initial_state": "internal",
        "states": [
            {"id": "internal", "title": "Internal draft", "transitions": ["hide"]},
            {"id": "private", "title": "Private", "transitions": ["show"]}
        ],
        "transitions": [
            {"id": "hide", "title": "Make private", "new_state_id": "private"},
            {"id": "show", "title": "Show internally", "new_state_id": "internal"}
        ]
    }))
    .expect("fixture parses")
}

/// A panel over a seeded fake, with the catalog loaded.
pub async fn panel() -> (Arc<FakeBackend>, Panel<FakeBackend>) {
    let backend = FakeBackend::seeded();
    let panel = Panel::new(Arc::clone(&backend));
    panel.catalog.refresh().await.expect("catalog loads");
    (backend, panel)
}

/// A panel with [`SIMPLE`] open.
pub async fn opened() -> (Arc<FakeBackend>, Panel<FakeBackend>) {
    let (backend, panel) = panel().await;
    panel.open(SIMPLE).await.expect("workflow opens");
    (backend, panel)
}

// ---- helpers ----

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub fn api_error(status: u16, message: &str) -> ApiError {
    ApiError::Api {
        status,
        message: message.to_string(),
        body: json!({ "error": message }).to_string(),
    }
}

fn state_not_found(workflow_id: &str, state_id: &str) -> ApiError {
    api_error(
        404,
        &format!("State '{state_id}' in workflow '{workflow_id}' not found."),
    )
}

fn decode<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, ApiError> {
    serde_json::from_value(value.clone()).map_err(|e| api_error(400, &e.to_string()))
}

fn refs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<EntityRef> {
    pairs
        .map(|(id, title)| EntityRef {
            id: id.to_string(),
            title: title.to_string(),
        })
        .collect()
}

fn roles() -> Vec<String> {
    ["Anonymous", "Owner", "Editor", "Reviewer", "Manager"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn groups() -> Vec<GroupInfo> {
    vec![GroupInfo {
        id: "staff".into(),
        title: "Staff".into(),
    }]
}

fn managed_permissions() -> Vec<PermissionInfo> {
    vec![PermissionInfo {
        perm: "View".into(),
        name: "view".into(),
        description: String::new(),
    }]
}
