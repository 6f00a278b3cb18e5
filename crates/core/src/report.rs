//! Sanity-check results.
//!
//! The backend does the checking; this module only holds what it returned.
//! Error texts are shown as received, grouped by bucket.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One reported problem with a state or transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub error: String,
}

impl ValidationIssue {
    /// Title when present, otherwise the id.
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// The error buckets of a completed sanity check.
///
/// Empty buckets and a `false` flag mean the check ran and found nothing.
/// "Not run" is [`ValidationOutcome::NotRun`], never an empty report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default)]
    pub state_errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub transition_errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub initial_state_error: bool,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.state_errors.is_empty() && self.transition_errors.is_empty() && !self.initial_state_error
    }

    /// Number of listed issues, counting the initial-state flag as one.
    pub fn issue_count(&self) -> usize {
        self.state_errors.len() + self.transition_errors.len() + usize::from(self.initial_state_error)
    }

    pub fn transition_issue(&self, transition_id: &str) -> Option<&ValidationIssue> {
        self.transition_errors.iter().find(|i| i.id == transition_id)
    }

    pub fn state_issue(&self, state_id: &str) -> Option<&ValidationIssue> {
        self.state_errors.iter().find(|i| i.id == state_id)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("No validation errors found.");
        }

        let mut sections = Vec::new();
        if self.initial_state_error {
            sections.push(
                "Initial State Error: The workflow must have a valid initial state.".to_string(),
            );
        }
        for (heading, issues) in [
            ("State Errors", &self.state_errors),
            ("Transition Errors", &self.transition_errors),
        ] {
            if issues.is_empty() {
                continue;
            }
            let mut section = heading.to_string();
            for issue in issues {
                section.push_str(&format!("\n  {}: {}", issue.label(), issue.error));
            }
            sections.push(section);
        }

        f.write_str(&sections.join("\n"))
    }
}

/// Where a workflow's sanity check stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValidationOutcome {
    #[default]
    NotRun,
    Running,
    Complete(ValidationReport),
    Failed(String),
}

impl ValidationOutcome {
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Complete(report) => Some(report),
            _ => None,
        }
    }

    pub fn has_run(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}
