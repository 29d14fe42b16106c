//! # Workflow Engine Core
//!
//! The crate-of-record for the workflow execution core's shared
//! vocabulary:
//!
//! - [`ids`] — opaque newtype identifiers for every entity.
//! - [`model`] — the versioned data model (definitions and instances).
//! - [`validation`] — acyclicity and execution-order checks over a
//!   workflow definition.
//! - [`error`] — the tagged [`WorkflowError`] result type, retry policy,
//!   circuit breaker, and recovery strategies every other crate builds
//!   on.
//! - [`auth`] — the authenticated caller shape services authorise
//!   against.
//! - [`config`] — environment-driven configuration.
//!
//! No I/O happens in this crate; persistence, scheduling, and dispatch
//! live in the crates built on top of it.

pub mod auth;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod testing;
pub mod validation;

pub use error::{ErrorCategory, ErrorSeverity, Result, WorkflowError};

/// Current version of the workflow engine core.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for crates that build on the core.
pub mod prelude {
    pub use crate::auth::CurrentUser;
    pub use crate::config::WorkflowConfig;
    pub use crate::error::{Result, WorkflowError};
    pub use crate::ids::{
        AdoptionId, AgentId, EdgeId, NodeBaseId, NodeId, NodeInstanceId, ProcessorId, SubdivisionId, TaskInstanceId,
        UserId, WorkflowBaseId, WorkflowId, WorkflowInstanceId,
    };
    pub use crate::model::{
        Edge, EdgeType, Node, NodeInstance, NodeInstanceStatus, NodeType, Processor, ProcessorBinding, ProcessorKind,
        TaskInstance, TaskInstanceStatus, Workflow, WorkflowInstance, WorkflowInstanceStatus,
    };
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};
}
