/// Workflow identifiers are backend-assigned strings (e.g. `simple_publication_workflow`).
pub type WorkflowId = String;

/// State identifier, unique within its workflow.
pub type StateId = String;

/// Transition identifier, unique within its workflow.
pub type TransitionId = String;

/// Role name, e.g. `Reviewer`.
pub type RoleName = String;

/// Permission name, e.g. `Modify portal content`.
pub type PermissionName = String;

/// Group identifier.
pub type GroupId = String;
