//! Per-instance dependency scheduling, workflow context management,
//! and the execution engine that drives a workflow instance from
//! start to a terminal status (§4.2-§4.4).

pub mod context_manager;
pub mod dependency_manager;
pub mod engine;

pub use context_manager::{DerivedStatus, UpstreamContext, WorkflowContext, WorkflowContextManager};
pub use dependency_manager::{DependencyEntry, DependencyManager};
pub use engine::{ExecutionEngine, TaskDispatcher};
