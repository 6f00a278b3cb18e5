//! Reverse index from transitions to the states that fire them.
//!
//! Transitions do not store their sources; a state lists the transitions it
//! owns. The index is built once per loaded definition and rebuilt whenever
//! the states change, instead of scanning the states on every lookup.

use std::collections::HashMap;

use crate::model::Workflow;
use crate::types::{StateId, TransitionId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIndex {
    sources: HashMap<TransitionId, Vec<StateId>>,
}

impl SourceIndex {
    /// Sources are listed in state display order. Ids a state references
    /// but which have no transition record are indexed too, so dangling
    /// references remain visible to callers that look for them.
    pub fn build(workflow: &Workflow) -> Self {
        let mut sources: HashMap<TransitionId, Vec<StateId>> = HashMap::new();
        for state in &workflow.states {
            for transition_id in &state.transitions {
                let entry = sources.entry(transition_id.clone()).or_default();
                if !entry.contains(&state.id) {
                    entry.push(state.id.clone());
                }
            }
        }
        Self { sources }
    }

    /// States that fire `transition_id`; empty when none do.
    pub fn sources_of(&self, transition_id: &str) -> &[StateId] {
        self.sources
            .get(transition_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `true` when at least one state fires `transition_id`.
    pub fn is_owned(&self, transition_id: &str) -> bool {
        !self.sources_of(transition_id).is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
