//! Editable field subsets for workflows, states, and transitions.
//!
//! Each draft is the shape of the PATCH body for its entity: serializing a
//! draft and diffing it against the baseline yields the changed fields.
//! Set-valued fields use ordered sets so that equality ignores the order the
//! backend happened to list them in.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{State, Transition, TriggerType, Workflow};
use crate::types::{GroupId, PermissionName, RoleName, StateId, TransitionId};

/// A draft type an edit session can track.
pub trait Draft: Clone + PartialEq + Serialize {
    /// The editing tab a field belongs to.
    type Tab: Copy + Eq + Ord + std::fmt::Debug;

    /// Map a serialized field name to its tab.
    fn tab_of(field: &str) -> Self::Tab;
}

// ---------------------------------------------------------------------------
// Workflow properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowTab {
    Properties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDraft {
    pub title: String,
    pub description: String,
}

impl WorkflowDraft {
    pub fn from_workflow(workflow: &Workflow) -> Self {
        Self {
            title: workflow.title.clone(),
            description: workflow.description.clone(),
        }
    }
}

impl Draft for WorkflowDraft {
    type Tab = WorkflowTab;

    fn tab_of(_field: &str) -> WorkflowTab {
        WorkflowTab::Properties
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StateTab {
    Properties,
    Transitions,
    Permissions,
    GroupRoles,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDraft {
    pub title: String,
    pub description: String,
    pub is_initial_state: bool,
    pub transitions: BTreeSet<TransitionId>,
    pub permission_roles: BTreeMap<PermissionName, BTreeSet<RoleName>>,
    pub group_roles: BTreeMap<GroupId, BTreeSet<RoleName>>,
}

impl StateDraft {
    pub fn from_state(workflow: &Workflow, state: &State) -> Self {
        Self {
            title: state.title.clone(),
            description: state.description.clone(),
            is_initial_state: workflow.is_initial(&state.id),
            transitions: state.transitions.iter().cloned().collect(),
            permission_roles: to_sets(&state.permission_roles),
            group_roles: to_sets(&state.group_roles),
        }
    }

    /// Grant or revoke `role` for `permission`.
    pub fn set_permission_role(&mut self, permission: &str, role: &str, granted: bool) {
        set_membership(&mut self.permission_roles, permission, role, granted);
    }

    /// Grant or revoke `role` for members of `group`.
    pub fn set_group_role(&mut self, group: &str, role: &str, granted: bool) {
        set_membership(&mut self.group_roles, group, role, granted);
    }
}

impl Draft for StateDraft {
    type Tab = StateTab;

    fn tab_of(field: &str) -> StateTab {
        match field {
            "transitions" => StateTab::Transitions,
            "permission_roles" => StateTab::Permissions,
            "group_roles" => StateTab::GroupRoles,
            _ => StateTab::Properties,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransitionTab {
    Properties,
    Guards,
    SourceStates,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardDraft {
    pub permissions: BTreeSet<PermissionName>,
    pub roles: BTreeSet<RoleName>,
    pub groups: BTreeSet<GroupId>,
    pub expr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDraft {
    pub title: String,
    pub description: String,
    pub new_state_id: Option<StateId>,
    pub trigger_type: TriggerType,
    pub guard: GuardDraft,
    /// Source states, written back by the backend into each state's
    /// transition list.
    pub states_with_this_transition: BTreeSet<StateId>,
}

impl TransitionDraft {
    /// `sources` comes from the source index, not from the transition.
    pub fn from_transition(transition: &Transition, sources: &[StateId]) -> Self {
        Self {
            title: transition.title.clone(),
            description: transition.description.clone(),
            new_state_id: transition.destination().map(str::to_string),
            trigger_type: transition.trigger_type,
            guard: GuardDraft {
                permissions: transition.guard.permissions.iter().cloned().collect(),
                roles: transition.guard.roles.iter().cloned().collect(),
                groups: transition.guard.groups.iter().cloned().collect(),
                expr: transition.guard.expr.clone(),
            },
            states_with_this_transition: sources.iter().cloned().collect(),
        }
    }
}

impl Draft for TransitionDraft {
    type Tab = TransitionTab;

    fn tab_of(field: &str) -> TransitionTab {
        match field {
            "guard" => TransitionTab::Guards,
            "states_with_this_transition" => TransitionTab::SourceStates,
            _ => TransitionTab::Properties,
        }
    }
}

// ---- helpers ----

fn to_sets(map: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, BTreeSet<String>> {
    map.iter()
        .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
        .collect()
}

fn set_membership(
    map: &mut BTreeMap<String, BTreeSet<String>>,
    key: &str,
    member: &str,
    present: bool,
) {
    if present {
        map.entry(key.to_string())
            .or_default()
            .insert(member.to_string());
    } else if let Some(members) = map.get_mut(key) {
        members.remove(member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow() -> Workflow {
        serde_json::from_value(json!({
            "id": "wf",
            "title": "WF",
            "initial_state": "private",
            "states": [
                {
                    "id": "private",
                    "title": "Private",
                    "transitions": ["publish", "submit"],
                    "permission_roles": {"View": ["Owner", "Manager"]}
                },
                {"id": "published", "title": "Published"}
            ],
            "transitions": [
                {"id": "publish", "title": "Publish", "new_state_id": "published",
                 "guard": {"roles": ["Reviewer", "Manager"]}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn state_draft_marks_initial_state() {
        let wf = workflow();
        let draft = StateDraft::from_state(&wf, wf.state("private").unwrap());
        assert!(draft.is_initial_state);

        let other = StateDraft::from_state(&wf, wf.state("published").unwrap());
        assert!(!other.is_initial_state);
    }

    #[test]
    fn set_fields_ignore_backend_order() {
        let wf = workflow();
        let mut reordered = wf.clone();
        reordered.states[0].transitions = vec!["submit".into(), "publish".into()];
        reordered.states[0]
            .permission_roles
            .insert("View".into(), vec!["Manager".into(), "Owner".into()]);

        let a = StateDraft::from_state(&wf, &wf.states[0]);
        let b = StateDraft::from_state(&reordered, &reordered.states[0]);
        assert_eq!(a, b);
    }

    #[test]
    fn permission_role_toggle() {
        let wf = workflow();
        let mut draft = StateDraft::from_state(&wf, &wf.states[0]);

        draft.set_permission_role("View", "Reviewer", true);
        assert!(draft.permission_roles["View"].contains("Reviewer"));

        draft.set_permission_role("View", "Owner", false);
        assert!(!draft.permission_roles["View"].contains("Owner"));

        draft.set_group_role("staff", "Editor", true);
        assert!(draft.group_roles["staff"].contains("Editor"));
    }

    #[test]
    fn transition_draft_takes_sources_from_index() {
        let wf = workflow();
        let t = wf.transition("publish").unwrap();
        let draft = TransitionDraft::from_transition(t, &["private".to_string()]);

        assert_eq!(draft.new_state_id.as_deref(), Some("published"));
        assert!(draft.states_with_this_transition.contains("private"));
        assert!(draft.guard.roles.contains("Reviewer"));
    }

    #[test]
    fn fields_map_to_tabs() {
        assert_eq!(StateDraft::tab_of("title"), StateTab::Properties);
        assert_eq!(StateDraft::tab_of("is_initial_state"), StateTab::Properties);
        assert_eq!(StateDraft::tab_of("group_roles"), StateTab::GroupRoles);
        assert_eq!(TransitionDraft::tab_of("guard"), TransitionTab::Guards);
        assert_eq!(
            TransitionDraft::tab_of("states_with_this_transition"),
            TransitionTab::SourceStates
        );
        assert_eq!(WorkflowDraft::tab_of("title"), WorkflowTab::Properties);
    }
}
