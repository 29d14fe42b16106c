//! Request/response bodies for the instance, task, and subdivision
//! routes (§6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use workflow_engine_core::ids::{NodeBaseId, SubdivisionId, WorkflowBaseId, WorkflowInstanceId};
use workflow_engine_core::model::instance::{TaskInstance, TaskInstanceStatus, WorkflowInstance, WorkflowInstanceStatus};
use workflow_engine_subdivision::{SubWorkflowDefinition, SubdivisionHierarchy};
use workflow_engine_tasks::{TaskDetails, TaskSummary};

#[derive(Debug, Deserialize)]
pub struct ExecuteWorkflowRequest {
    pub workflow_base_id: WorkflowBaseId,
    pub instance_name: Option<String>,
    pub input_data: Value,
    #[serde(default)]
    pub context_data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteWorkflowResponse {
    pub workflow_instance_id: WorkflowInstanceId,
}

#[derive(Debug, Serialize)]
pub struct CancelInstanceResponse {
    pub cancelled_tasks_count: usize,
    pub status: WorkflowInstanceStatus,
}

#[derive(Debug, Serialize)]
pub struct NodeStatusCounts {
    pub pending: usize,
    pub waiting: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Serialize)]
pub struct InstanceDetailResponse {
    pub instance: WorkflowInstance,
    pub node_counts: NodeStatusCounts,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskInstanceStatus>,
    #[serde(default = "default_task_limit")]
    pub limit: usize,
}

fn default_task_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Serialize)]
pub struct TaskDetailResponse(pub TaskDetails);

#[derive(Debug, Deserialize)]
pub struct SubmitTaskRequest {
    pub result_data: Value,
    pub result_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PauseOrRejectOrCancelRequest {
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse(pub TaskInstance);

#[derive(Debug, Deserialize)]
pub struct SubdivideTaskRequest {
    pub subdivision_name: String,
    pub sub_workflow_data: SubWorkflowDefinition,
    #[serde(default)]
    pub execute_immediately: bool,
    #[serde(default)]
    pub parent_subdivision_id: Option<SubdivisionId>,
    #[serde(default)]
    pub context_to_pass: Value,
}

#[derive(Debug, Deserialize)]
pub struct AdoptSubdivisionRequest {
    pub subdivision_id: SubdivisionId,
    pub target_node_id: NodeBaseId,
    pub adoption_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSubdivisionsQuery {
    #[serde(default)]
    pub with_instances_only: bool,
}

#[derive(Debug, Serialize)]
pub struct SubdivisionHierarchyResponse(pub SubdivisionHierarchy);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}
