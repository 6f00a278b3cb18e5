//! Workflow definition to nodes and edges.

use std::collections::HashSet;

use serde::Serialize;

use super::highlight::Highlight;
use super::layout::{circle_position, Position};
use crate::model::Workflow;
use crate::types::{StateId, TransitionId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: StateId,
    pub label: String,
    pub description: String,
    pub is_initial: bool,
    pub is_final: bool,
    pub highlighted: bool,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    /// `{source}-{transition}-{target}`.
    pub id: String,
    pub source: StateId,
    pub target: StateId,
    pub transition_id: TransitionId,
    pub label: String,
    pub description: String,
    pub automatic: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Projection {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Edges drawn for one transition, one per source state.
    pub fn edges_for(&self, transition_id: &str) -> impl Iterator<Item = &GraphEdge> {
        let transition_id = transition_id.to_string();
        self.edges
            .iter()
            .filter(move |e| e.transition_id == transition_id)
    }
}

pub fn edge_id(source: &str, transition: &str, target: &str) -> String {
    format!("{source}-{transition}-{target}")
}

/// Project a workflow into graph form.
///
/// One node per state, in state order. One edge per (state, transition id)
/// pair whose transition exists and whose destination is a live state;
/// anything else is skipped without error.
pub fn project(workflow: &Workflow, highlight: &Highlight) -> Projection {
    let count = workflow.states.len();

    let nodes = workflow
        .states
        .iter()
        .enumerate()
        .map(|(i, state)| GraphNode {
            id: state.id.clone(),
            label: label_or_id(&state.title, &state.id),
            description: state.description.clone(),
            is_initial: workflow.is_initial(&state.id),
            is_final: state.is_final(),
            highlighted: highlight.is_state(&state.id),
            position: circle_position(i, count),
        })
        .collect();

    let mut edges = Vec::new();
    let mut seen = HashSet::new();
    for state in &workflow.states {
        for transition_id in &state.transitions {
            let Some(transition) = workflow.transition(transition_id) else {
                continue;
            };
            let Some(target) = workflow.destination_of(transition) else {
                continue;
            };

            let id = edge_id(&state.id, &transition.id, &target.id);
            if !seen.insert(id.clone()) {
                continue;
            }

            edges.push(GraphEdge {
                id,
                source: state.id.clone(),
                target: target.id.clone(),
                transition_id: transition.id.clone(),
                label: label_or_id(&transition.title, &transition.id),
                description: transition.description.clone(),
                automatic: transition.trigger_type.is_automatic(),
                highlighted: highlight.is_transition(&transition.id),
            });
        }
    }

    Projection { nodes, edges }
}

fn label_or_id(title: &str, id: &str) -> String {
    if title.trim().is_empty() {
        id.to_string()
    } else {
        title.to_string()
    }
}
