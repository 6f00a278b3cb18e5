//! Graph view of a workflow.
//!
//! States become nodes and (source state, transition) pairs become edges.
//! The projection is recomputed from scratch whenever the definition or the
//! highlight changes; nothing here is incremental.

pub mod dot;
pub mod highlight;
pub mod index;
pub mod layout;
pub mod projection;

pub use dot::to_dot;
pub use highlight::{Highlight, HighlightTracker, HIGHLIGHT_WINDOW};
pub use index::SourceIndex;
pub use layout::Position;
pub use projection::{project, GraphEdge, GraphNode, Projection};
