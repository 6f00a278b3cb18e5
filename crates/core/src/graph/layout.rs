//! Deterministic initial layout for workflow graphs.
//!
//! Nodes are spread evenly on a circle whose radius grows with the node
//! count. The positions carry no meaning; they only give the renderer a
//! stable, non-overlapping starting point.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Circle center, X.
pub const LAYOUT_CENTER_X: f64 = 400.0;

/// Circle center, Y.
pub const LAYOUT_CENTER_Y: f64 = 300.0;

/// Radius used for small graphs.
pub const MIN_LAYOUT_RADIUS: f64 = 200.0;

/// Radius growth per node once the graph outgrows the minimum.
pub const RADIUS_PER_NODE: f64 = 40.0;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Radius of the layout circle for `count` nodes.
pub fn layout_radius(count: usize) -> f64 {
    MIN_LAYOUT_RADIUS.max(count as f64 * RADIUS_PER_NODE)
}

/// Position of node `index` out of `count`.
///
/// `angle = index * 2π / count`, placed on a circle of
/// [`layout_radius`]`(count)` around the fixed center.
pub fn circle_position(index: usize, count: usize) -> Position {
    let count = count.max(1);
    let angle = index as f64 * std::f64::consts::TAU / count as f64;
    let radius = layout_radius(count);
    Position {
        x: LAYOUT_CENTER_X + angle.cos() * radius,
        y: LAYOUT_CENTER_Y + angle.sin() * radius,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
