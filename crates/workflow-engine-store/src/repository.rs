//! Typed repository traits over the relational store (§4.1).
//!
//! Mirrors the teacher's `AgentRegistry` shape: an `#[async_trait]`
//! trait, automocked under `cfg(test)`, with Postgres and in-memory
//! implementations living in sibling modules.

use async_trait::async_trait;
use workflow_engine_core::ids::{
    AdoptionId, NodeId, ProcessorId, SubdivisionId, TaskInstanceId, UserId, WorkflowBaseId, WorkflowId,
    WorkflowInstanceId,
};
use workflow_engine_core::model::definition::{Edge, Node, Processor, ProcessorBinding, Workflow};
use workflow_engine_core::model::instance::{NodeInstance, TaskInstance, TaskInstanceStatus, WorkflowInstance};
use workflow_engine_core::model::subdivision::{Adoption, Subdivision};

use crate::error::StoreResult;

/// The full node graph of one workflow version, as stored.
#[derive(Debug, Clone)]
pub struct WorkflowVersionGraph {
    pub workflow: Workflow,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub bindings: Vec<ProcessorBinding>,
}

/// Per-instance counts returned by a cascade delete (§4.1, and the
/// cascade-deletion reporting supplement from the original system).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CascadeDeleteReport {
    pub workflow_instances_deleted: usize,
    pub node_instances_deleted: usize,
    pub task_instances_deleted: usize,
    pub subdivisions_deleted: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// The `is_current_version ∧ ¬is_deleted` row for this base id.
    /// More than one match is a fatal [`crate::error::StoreError`]
    /// corruption signal, never silently resolved.
    async fn get_current(&self, workflow_base_id: WorkflowBaseId) -> StoreResult<WorkflowVersionGraph>;

    async fn get_version(&self, workflow_id: WorkflowId) -> StoreResult<WorkflowVersionGraph>;

    /// Creates version 1 of a brand-new workflow base id.
    async fn create_initial(&self, graph: WorkflowVersionGraph) -> StoreResult<WorkflowVersionGraph>;

    /// Atomic new-version creation: marks the current row non-current
    /// and persists `next_version` (already computed by
    /// [`crate::versioning::next_version`] or a caller-supplied splice
    /// such as adopt-subdivision) in one transaction. Failure at any
    /// step rolls the whole version back. Invalidates the dependency
    /// manager's per-version upstream-set cache for the base id (the
    /// cache is keyed by immutable version, so only a new version
    /// requires invalidation).
    async fn create_new_version(
        &self,
        workflow_base_id: WorkflowBaseId,
        next_version: WorkflowVersionGraph,
    ) -> StoreResult<WorkflowVersionGraph>;

    /// Soft-deletes every version of a workflow base id and cascades
    /// through its instances; returns the report.
    async fn cascade_delete(&self, workflow_base_id: WorkflowBaseId, hard: bool) -> StoreResult<CascadeDeleteReport>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessorRepository: Send + Sync {
    async fn get(&self, processor_id: ProcessorId) -> StoreResult<Processor>;
    async fn get_many(&self, ids: &[ProcessorId]) -> StoreResult<Vec<Processor>>;
    async fn create(&self, processor: Processor) -> StoreResult<Processor>;
    /// Clears (does not cascade) references to `processor_id` from
    /// node-processor bindings before the processor row is deleted.
    async fn clear_references(&self, processor_id: ProcessorId) -> StoreResult<usize>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    async fn create_workflow_instance(&self, instance: WorkflowInstance) -> StoreResult<WorkflowInstance>;
    async fn get_workflow_instance(&self, id: WorkflowInstanceId) -> StoreResult<WorkflowInstance>;
    async fn update_workflow_instance(&self, instance: WorkflowInstance) -> StoreResult<WorkflowInstance>;

    async fn create_node_instance(&self, instance: NodeInstance) -> StoreResult<NodeInstance>;
    async fn get_node_instance(&self, id: workflow_engine_core::ids::NodeInstanceId) -> StoreResult<NodeInstance>;
    async fn update_node_instance(&self, instance: NodeInstance) -> StoreResult<NodeInstance>;
    async fn list_node_instances(&self, workflow_instance_id: WorkflowInstanceId) -> StoreResult<Vec<NodeInstance>>;
    async fn get_node_instance_by_node(
        &self,
        workflow_instance_id: WorkflowInstanceId,
        node_id: NodeId,
    ) -> StoreResult<NodeInstance>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: TaskInstance) -> StoreResult<TaskInstance>;
    async fn get(&self, id: TaskInstanceId) -> StoreResult<TaskInstance>;
    async fn update(&self, task: TaskInstance) -> StoreResult<TaskInstance>;
    async fn list_for_node(&self, node_instance_id: workflow_engine_core::ids::NodeInstanceId) -> StoreResult<Vec<TaskInstance>>;
    async fn list_for_user(
        &self,
        user_id: UserId,
        status_filter: Option<TaskInstanceStatus>,
        limit: usize,
    ) -> StoreResult<Vec<TaskInstance>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubdivisionRepository: Send + Sync {
    async fn create_subdivision(&self, subdivision: Subdivision) -> StoreResult<Subdivision>;
    async fn get_subdivision(&self, id: SubdivisionId) -> StoreResult<Subdivision>;
    async fn update_subdivision(&self, subdivision: Subdivision) -> StoreResult<Subdivision>;
    async fn list_for_task(&self, original_task_id: TaskInstanceId) -> StoreResult<Vec<Subdivision>>;
    /// Un-selects every sibling subdivision of `original_task_id` other
    /// than `keep`.
    async fn deselect_siblings(&self, original_task_id: TaskInstanceId, keep: SubdivisionId) -> StoreResult<()>;

    async fn create_adoption(&self, adoption: Adoption) -> StoreResult<Adoption>;
    async fn list_adoptions_for_workflow(&self, workflow_base_id: WorkflowBaseId) -> StoreResult<Vec<Adoption>>;
}
