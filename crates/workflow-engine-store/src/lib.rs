//! Persistence layer for workflow definitions, instances, tasks, and
//! subdivisions (§4.1). Exposes typed repository traits with a
//! Postgres-backed implementation (via diesel) and an in-memory
//! implementation used by this workspace's test suites.

pub mod error;
pub mod memory;
pub mod repository;
#[cfg(feature = "postgres")]
pub mod rows;
#[cfg(feature = "postgres")]
pub mod schema;
pub mod versioning;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::{StoreError, StoreResult};
pub use repository::{
    CascadeDeleteReport, InstanceRepository, ProcessorRepository, SubdivisionRepository, TaskRepository,
    WorkflowRepository, WorkflowVersionGraph,
};
