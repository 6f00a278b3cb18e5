//! Graphviz DOT export.
//!
//! Mirrors the backend's own DOT rendering so a locally loaded definition
//! can be drawn without a round trip. States are boxes. Transitions sharing
//! a (source, destination) pair are merged into one edge whose label lists
//! each of them with its guard summary.

use std::fmt::Write;

use crate::model::{Guard, Workflow};

/// Pseudo-source for transitions no state owns.
const NO_SOURCE: &str = "None";

const STATE_FILL: &str = "#ffcc99";

/// Render `workflow` as a DOT digraph.
pub fn to_dot(workflow: &Workflow) -> String {
    let mut out = format!("digraph \"{}\" {{\n", escape(&workflow.title));
    let mut edges: Vec<((String, String), Vec<String>)> = Vec::new();
    let mut owned: Vec<&str> = Vec::new();

    for state in &workflow.states {
        let _ = writeln!(
            out,
            "\"{}\" [shape=box,label=\"{}\",style=\"filled\",fillcolor=\"{STATE_FILL}\"];",
            escape(&state.id),
            object_label(&state.title, &state.id),
        );

        for transition_id in &state.transitions {
            owned.push(transition_id);
            let Some(transition) = workflow.transition(transition_id) else {
                let _ = writeln!(
                    out,
                    "# transition \"{}\" from state \"{}\" is missing",
                    escape(transition_id),
                    escape(&state.id),
                );
                continue;
            };

            let target = transition.destination().unwrap_or(&state.id);
            push_edge(
                &mut edges,
                (state.id.clone(), target.to_string()),
                transition_label(&transition.title, &transition.id, &transition.guard),
            );
        }
    }

    for transition in &workflow.transitions {
        if owned.contains(&transition.id.as_str()) {
            continue;
        }
        let target = transition.destination().unwrap_or(NO_SOURCE);
        push_edge(
            &mut edges,
            (NO_SOURCE.to_string(), target.to_string()),
            transition_label(&transition.title, &transition.id, &transition.guard),
        );
    }

    for ((source, target), labels) in &edges {
        let _ = writeln!(
            out,
            "\"{}\" -> \"{}\" [label=\"{}\"];",
            escape(source),
            escape(target),
            labels.join(","),
        );
    }

    out.push('}');
    out
}

/// `"Title\n(id: id)"` when titled, otherwise the bare id.
fn object_label(title: &str, id: &str) -> String {
    if title.is_empty() {
        escape(id)
    } else {
        format!("{}\\n(id: {})", escape(title), escape(id))
    }
}

fn transition_label(title: &str, id: &str, guard: &Guard) -> String {
    format!("{} {}", object_label(title, id), escape(&guard_summary(guard)))
}

/// One-line summary of a guard, empty when it has no conditions.
pub fn guard_summary(guard: &Guard) -> String {
    let mut parts = Vec::new();
    if !guard.expr.is_empty() {
        parts.push(format!("Expression: {};", guard.expr));
    }
    if !guard.permissions.is_empty() {
        parts.push(format!("Permissions: {};", guard.permissions.join(",")));
    }
    if !guard.roles.is_empty() {
        parts.push(format!("Roles: {};", guard.roles.join(",")));
    }
    if !guard.groups.is_empty() {
        parts.push(format!("Groups: {};", guard.groups.join(",")));
    }
    parts.join(" ")
}

fn push_edge(edges: &mut Vec<((String, String), Vec<String>)>, key: (String, String), label: String) {
    match edges.iter_mut().find(|(k, _)| *k == key) {
        Some((_, labels)) => labels.push(label),
        None => edges.push((key, vec![label])),
    }
}

fn escape(s: &str) -> String {
    s.replace('"', "\\\"")
}
