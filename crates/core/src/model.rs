//! Workflow definition records as exchanged with the CMS backend.
//!
//! The backend is loose about its JSON: collections may be `null` or missing,
//! the catalog listing spells the destination `new_state` while the
//! transition endpoints spell it `new_state_id`, and `trigger_type` arrives
//! either as the DCWorkflow integer code or as a boolean. All of that is
//! absorbed here so the rest of the code sees one shape.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};

use crate::types::{GroupId, PermissionName, RoleName, StateId, TransitionId, WorkflowId};

/// Deserialize `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition.
///
/// The catalog listing returns entries of this same shape (with slimmer
/// state and transition records), so a catalog summary is also a
/// `Workflow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Must name a member of `states` when set.
    #[serde(default)]
    pub initial_state: Option<StateId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assigned_types: Vec<String>,
    /// Display order only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub states: Vec<State>,
    /// Display order only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub transitions: Vec<Transition>,
    /// Read-only reference data supplied by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_data: Option<ContextData>,
}

/// Catalog entries share the full workflow shape.
pub type WorkflowSummary = Workflow;

impl Workflow {
    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == id)
    }

    /// `true` when `initial_state` is set and names an existing state.
    pub fn initial_state_resolves(&self) -> bool {
        self.initial_state
            .as_deref()
            .is_some_and(|id| self.state(id).is_some())
    }

    pub fn is_initial(&self, state_id: &str) -> bool {
        self.initial_state.as_deref() == Some(state_id)
    }

    /// Resolve a transition's destination to a live state.
    pub fn destination_of(&self, transition: &Transition) -> Option<&State> {
        transition.destination().and_then(|id| self.state(id))
    }

    /// `(id, title)` pairs of all states, for sibling title checks.
    pub fn state_titles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.states.iter().map(|s| (s.id.as_str(), s.title.as_str()))
    }

    /// `(id, title)` pairs of all transitions, for sibling title checks.
    pub fn transition_titles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.transitions
            .iter()
            .map(|t| (t.id.as_str(), t.title.as_str()))
    }

    /// Display title, falling back to the id when the title is blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Transitions this state can fire (the ownership edge).
    #[serde(default, deserialize_with = "null_as_default")]
    pub transitions: Vec<TransitionId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permission_roles: BTreeMap<PermissionName, Vec<RoleName>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_roles: BTreeMap<GroupId, Vec<RoleName>>,
}

impl State {
    /// A state that fires no transitions is terminal by convention.
    pub fn is_final(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn has_transition(&self, transition_id: &str) -> bool {
        self.transitions.iter().any(|t| t == transition_id)
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: TransitionId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, alias = "new_state")]
    pub new_state_id: Option<StateId>,
    #[serde(default)]
    pub trigger_type: TriggerType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub guard: Guard,
}

impl Transition {
    /// Destination state id, treating an empty string as "none".
    pub fn destination(&self) -> Option<&str> {
        self.new_state_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Conditions gating whether a transition may fire. Evaluated server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    #[serde(default, deserialize_with = "null_as_default")]
    pub permissions: Vec<PermissionName>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<RoleName>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<GroupId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expr: String,
}

impl Guard {
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
            && self.roles.is_empty()
            && self.groups.is_empty()
            && self.expr.trim().is_empty()
    }
}

/// How a transition is fired.
///
/// On the wire this is the DCWorkflow integer code (`0` automatic, `1`
/// user action). Booleans are also accepted, `true` meaning automatic.
/// Codes other than `0` are read as user actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TriggerType {
    Automatic,
    #[default]
    UserAction,
}

impl TriggerType {
    pub fn as_code(self) -> u8 {
        match self {
            Self::Automatic => 0,
            Self::UserAction => 1,
        }
    }

    pub fn from_code(code: i64) -> Self {
        if code == 0 {
            Self::Automatic
        } else {
            Self::UserAction
        }
    }

    pub fn is_automatic(self) -> bool {
        self == Self::Automatic
    }
}

impl Serialize for TriggerType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_code())
    }
}

impl<'de> Deserialize<'de> for TriggerType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Flag(bool),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Self::from_code(code),
            Raw::Flag(true) => Self::Automatic,
            Raw::Flag(false) => Self::UserAction,
        })
    }
}

// ---------------------------------------------------------------------------
// Context data
// ---------------------------------------------------------------------------

/// Reference data the backend attaches to a workflow for the editing forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub assignable_types: Vec<AssignableType>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub available_roles: Vec<RoleName>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groups: Vec<GroupInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub managed_permissions: Vec<PermissionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignableType {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: GroupId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionInfo {
    pub perm: PermissionName,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
