//! Domain logic for the workflow manager.
//!
//! Everything here is pure: the workflow data model, the graph projection
//! used for rendering, edit-session reconciliation, and the title pre-checks
//! run before anything is submitted to the CMS backend. No I/O lives in this
//! crate, so it can be shared by the REST client and the panel stores.

pub mod diff;
pub mod drafts;
pub mod error;
pub mod graph;
pub mod model;
pub mod naming;
pub mod report;
pub mod session;
pub mod titles;
pub mod types;
