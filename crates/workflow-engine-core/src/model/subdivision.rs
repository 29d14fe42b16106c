//! Subdivision and adoption: a running task can spawn a nested
//! sub-workflow whose graph can later be spliced back into the parent
//! workflow as a new version.

use crate::ids::{AdoptionId, NodeId, SubdivisionId, TaskInstanceId, WorkflowBaseId, WorkflowId, WorkflowInstanceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subdivision {
    pub subdivision_id: SubdivisionId,
    pub original_task_id: TaskInstanceId,
    pub sub_workflow_base_id: WorkflowBaseId,
    pub sub_workflow_instance_id: Option<WorkflowInstanceId>,
    pub parent_subdivision_id: Option<SubdivisionId>,
    pub name: Option<String>,
    pub is_selected: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Subdivision {
    pub fn new(
        original_task_id: TaskInstanceId,
        sub_workflow_base_id: WorkflowBaseId,
        parent_subdivision_id: Option<SubdivisionId>,
        name: Option<String>,
    ) -> Self {
        Self {
            subdivision_id: SubdivisionId::new(),
            original_task_id,
            sub_workflow_base_id,
            sub_workflow_instance_id: None,
            parent_subdivision_id,
            name,
            is_selected: false,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }
}

/// Records that a selected subdivision's graph replaced one node of a
/// workflow, producing a new version of that workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adoption {
    pub adoption_id: AdoptionId,
    pub subdivision_id: SubdivisionId,
    pub original_workflow_base_id: WorkflowBaseId,
    pub new_workflow_id: WorkflowId,
    pub target_node_id: NodeId,
    pub adoption_name: Option<String>,
    /// node_base_ids of the nodes spliced in from the subdivision's
    /// sub-workflow, in the new version.
    pub new_node_ids: Vec<NodeId>,
    pub created_at: DateTime<Utc>,
}

impl Adoption {
    pub fn new(
        subdivision_id: SubdivisionId,
        original_workflow_base_id: WorkflowBaseId,
        new_workflow_id: WorkflowId,
        target_node_id: NodeId,
        adoption_name: Option<String>,
        new_node_ids: Vec<NodeId>,
    ) -> Self {
        Self {
            adoption_id: AdoptionId::new(),
            subdivision_id,
            original_workflow_base_id,
            new_workflow_id,
            target_node_id,
            adoption_name,
            new_node_ids,
            created_at: Utc::now(),
        }
    }
}
