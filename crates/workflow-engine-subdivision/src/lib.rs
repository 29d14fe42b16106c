//! Task subdivision: spawning a nested sub-workflow from a running
//! task, selecting among alternatives, and adopting a selected
//! subdivision's shape back into the parent workflow as a new version
//! (§4.8).

pub mod definition;
pub mod error;
pub mod service;

pub use definition::{build_graph, BuiltGraph, SubWorkflowDefinition, SubWorkflowEdgeSpec, SubWorkflowNodeSpec};
pub use error::{SubdivisionServiceError, SubdivisionServiceResult};
pub use service::{SubdivisionHierarchy, SubdivisionService};
