//! The versioned data model: definition types (workflow, node, edge,
//! processor) and their append-only instance counterparts (workflow
//! instance, node instance, task instance, subdivision/adoption).

pub mod definition;
pub mod instance;
pub mod subdivision;

pub use definition::{Edge, EdgeType, Node, NodeType, Processor, ProcessorBinding, ProcessorKind, Workflow};
pub use instance::{
    NodeInstance, NodeInstanceStatus, TaskInstance, TaskInstanceStatus, WorkflowInstance, WorkflowInstanceStatus,
};
pub use subdivision::{Adoption, Subdivision};
