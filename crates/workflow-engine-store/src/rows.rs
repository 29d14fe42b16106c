//! Diesel row types and their conversions to/from the core domain
//! model. Kept separate from [`crate::schema`] the way the teacher
//! keeps `db::user::User` separate from `db::schema::users`.

#![cfg(feature = "postgres")]

use crate::schema::*;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;
use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::ids::*;
use workflow_engine_core::model::definition::{Edge, EdgeType, Node, NodeType, Processor, ProcessorKind, Workflow};
use workflow_engine_core::model::instance::{
    NodeInstance, NodeInstanceStatus, TaskInstance, TaskInstanceStatus, TaskPriority, WorkflowInstance,
    WorkflowInstanceStatus,
};
use workflow_engine_core::model::subdivision::{Adoption, Subdivision};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workflows)]
pub struct WorkflowRow {
    pub workflow_base_id: Uuid,
    pub workflow_id: Uuid,
    pub version: i32,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub parent_version_id: Option<Uuid>,
    pub change_note: Option<String>,
    pub is_current_version: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Workflow> for WorkflowRow {
    fn from(w: &Workflow) -> Self {
        Self {
            workflow_base_id: w.workflow_base_id.into(),
            workflow_id: w.workflow_id.into(),
            version: w.version,
            name: w.name.clone(),
            description: w.description.clone(),
            creator_id: w.creator_id.into(),
            parent_version_id: w.parent_version_id.map(Into::into),
            change_note: w.change_note.clone(),
            is_current_version: w.is_current_version,
            is_deleted: w.is_deleted,
            created_at: w.created_at,
        }
    }
}

impl TryFrom<WorkflowRow> for Workflow {
    type Error = WorkflowError;

    fn try_from(row: WorkflowRow) -> Result<Self> {
        Ok(Workflow {
            workflow_base_id: row.workflow_base_id.into(),
            workflow_id: row.workflow_id.into(),
            version: row.version,
            name: row.name,
            description: row.description,
            creator_id: row.creator_id.into(),
            parent_version_id: row.parent_version_id.map(Into::into),
            change_note: row.change_note,
            is_current_version: row.is_current_version,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = nodes)]
pub struct NodeRow {
    pub node_base_id: Uuid,
    pub node_id: Uuid,
    pub workflow_id: Uuid,
    pub node_type: String,
    pub name: String,
    pub task_description: Option<String>,
    pub layout_hint: Option<serde_json::Value>,
}

impl From<&Node> for NodeRow {
    fn from(n: &Node) -> Self {
        Self {
            node_base_id: n.node_base_id.into(),
            node_id: n.node_id.into(),
            workflow_id: n.workflow_id.into(),
            node_type: node_type_to_str(n.node_type).to_string(),
            name: n.name.clone(),
            task_description: n.task_description.clone(),
            layout_hint: n.layout_hint.clone(),
        }
    }
}

impl TryFrom<NodeRow> for Node {
    type Error = WorkflowError;

    fn try_from(row: NodeRow) -> Result<Self> {
        Ok(Node {
            node_base_id: row.node_base_id.into(),
            node_id: row.node_id.into(),
            workflow_id: row.workflow_id.into(),
            node_type: node_type_from_str(&row.node_type)?,
            name: row.name,
            task_description: row.task_description,
            layout_hint: row.layout_hint,
        })
    }
}

fn node_type_to_str(t: NodeType) -> &'static str {
    match t {
        NodeType::Start => "start",
        NodeType::Processor => "processor",
        NodeType::End => "end",
    }
}

fn node_type_from_str(s: &str) -> Result<NodeType> {
    match s {
        "start" => Ok(NodeType::Start),
        "processor" => Ok(NodeType::Processor),
        "end" => Ok(NodeType::End),
        other => Err(WorkflowError::data_parse(format!("unknown node_type '{other}'"))),
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = edges)]
pub struct EdgeRow {
    pub edge_id: Uuid,
    pub workflow_id: Uuid,
    pub from_node_id: Uuid,
    pub to_node_id: Uuid,
    pub edge_type: String,
    pub condition_metadata: Option<serde_json::Value>,
}

impl From<&Edge> for EdgeRow {
    fn from(e: &Edge) -> Self {
        Self {
            edge_id: e.edge_id.into(),
            workflow_id: e.workflow_id.into(),
            from_node_id: e.from_node_id.into(),
            to_node_id: e.to_node_id.into(),
            edge_type: edge_type_to_str(e.edge_type).to_string(),
            condition_metadata: e.condition_metadata.clone(),
        }
    }
}

impl TryFrom<EdgeRow> for Edge {
    type Error = WorkflowError;

    fn try_from(row: EdgeRow) -> Result<Self> {
        Ok(Edge {
            edge_id: row.edge_id.into(),
            workflow_id: row.workflow_id.into(),
            from_node_id: row.from_node_id.into(),
            to_node_id: row.to_node_id.into(),
            edge_type: edge_type_from_str(&row.edge_type)?,
            condition_metadata: row.condition_metadata,
        })
    }
}

fn edge_type_to_str(t: EdgeType) -> &'static str {
    match t {
        EdgeType::Normal => "normal",
        EdgeType::Conditional => "conditional",
        EdgeType::Parallel => "parallel",
    }
}

fn edge_type_from_str(s: &str) -> Result<EdgeType> {
    match s {
        "normal" => Ok(EdgeType::Normal),
        "conditional" => Ok(EdgeType::Conditional),
        "parallel" => Ok(EdgeType::Parallel),
        other => Err(WorkflowError::data_parse(format!("unknown edge_type '{other}'"))),
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = processors)]
pub struct ProcessorRow {
    pub processor_id: Uuid,
    pub name: String,
    pub kind: String,
    pub user_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub strong_agent_id: Option<Uuid>,
}

impl From<&Processor> for ProcessorRow {
    fn from(p: &Processor) -> Self {
        let (kind, user_id, agent_id, strong_agent_id) = match p.kind {
            ProcessorKind::Human => ("human", p.user_id.map(Into::into), None, None),
            ProcessorKind::Agent => ("agent", None, p.agent_id.map(Into::into), None),
            ProcessorKind::Mix => ("mix", p.user_id.map(Into::into), p.agent_id.map(Into::into), None),
            ProcessorKind::Simulator => {
                ("simulator", None, p.agent_id.map(Into::into), p.strong_agent_id.map(Into::into))
            }
        };
        Self { processor_id: p.processor_id.into(), name: p.name.clone(), kind: kind.to_string(), user_id, agent_id, strong_agent_id }
    }
}

impl TryFrom<ProcessorRow> for Processor {
    type Error = WorkflowError;

    fn try_from(row: ProcessorRow) -> Result<Self> {
        let kind = match row.kind.as_str() {
            "human" => ProcessorKind::Human,
            "agent" => ProcessorKind::Agent,
            "mix" => ProcessorKind::Mix,
            "simulator" => ProcessorKind::Simulator,
            other => return Err(WorkflowError::data_parse(format!("unknown processor kind '{other}'"))),
        };
        let processor = Processor {
            processor_id: row.processor_id.into(),
            name: row.name,
            kind,
            user_id: row.user_id.map(Into::into),
            agent_id: row.agent_id.map(Into::into),
            strong_agent_id: row.strong_agent_id.map(Into::into),
        };
        processor.validate()?;
        Ok(processor)
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workflow_instances)]
pub struct WorkflowInstanceRow {
    pub workflow_instance_id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_base_id: Uuid,
    pub executor_id: Uuid,
    pub trigger_user_id: Uuid,
    pub status: String,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub instance_name: Option<String>,
    pub is_deleted: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<&WorkflowInstance> for WorkflowInstanceRow {
    fn from(i: &WorkflowInstance) -> Self {
        Self {
            workflow_instance_id: i.workflow_instance_id.into(),
            workflow_id: i.workflow_id.into(),
            workflow_base_id: i.workflow_base_id.into(),
            executor_id: i.executor_id.into(),
            trigger_user_id: i.trigger_user_id.into(),
            status: workflow_instance_status_to_str(i.status).to_string(),
            input_data: i.input_data.clone(),
            output_data: i.output_data.clone(),
            instance_name: i.instance_name.clone(),
            is_deleted: i.is_deleted,
            started_at: i.started_at,
            completed_at: i.completed_at,
            updated_at: i.updated_at,
        }
    }
}

impl TryFrom<WorkflowInstanceRow> for WorkflowInstance {
    type Error = WorkflowError;

    fn try_from(row: WorkflowInstanceRow) -> Result<Self> {
        Ok(WorkflowInstance {
            workflow_instance_id: row.workflow_instance_id.into(),
            workflow_id: row.workflow_id.into(),
            workflow_base_id: row.workflow_base_id.into(),
            executor_id: row.executor_id.into(),
            trigger_user_id: row.trigger_user_id.into(),
            status: workflow_instance_status_from_str(&row.status)?,
            input_data: row.input_data,
            output_data: row.output_data,
            instance_name: row.instance_name,
            is_deleted: row.is_deleted,
            started_at: row.started_at,
            completed_at: row.completed_at,
            updated_at: row.updated_at,
        })
    }
}

pub fn workflow_instance_status_to_str(s: WorkflowInstanceStatus) -> &'static str {
    match s {
        WorkflowInstanceStatus::Pending => "pending",
        WorkflowInstanceStatus::Running => "running",
        WorkflowInstanceStatus::Paused => "paused",
        WorkflowInstanceStatus::Completed => "completed",
        WorkflowInstanceStatus::Failed => "failed",
        WorkflowInstanceStatus::Cancelled => "cancelled",
    }
}

pub fn workflow_instance_status_from_str(s: &str) -> Result<WorkflowInstanceStatus> {
    match s {
        "pending" => Ok(WorkflowInstanceStatus::Pending),
        "running" => Ok(WorkflowInstanceStatus::Running),
        "paused" => Ok(WorkflowInstanceStatus::Paused),
        "completed" => Ok(WorkflowInstanceStatus::Completed),
        "failed" => Ok(WorkflowInstanceStatus::Failed),
        "cancelled" => Ok(WorkflowInstanceStatus::Cancelled),
        other => Err(WorkflowError::data_parse(format!("unknown workflow instance status '{other}'"))),
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = node_instances)]
pub struct NodeInstanceRow {
    pub node_instance_id: Uuid,
    pub workflow_instance_id: Uuid,
    pub node_id: Uuid,
    pub status: String,
    pub input_data: Option<serde_json::Value>,
    pub output_data: Option<serde_json::Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&NodeInstance> for NodeInstanceRow {
    fn from(n: &NodeInstance) -> Self {
        Self {
            node_instance_id: n.node_instance_id.into(),
            workflow_instance_id: n.workflow_instance_id.into(),
            node_id: n.node_id.into(),
            status: node_instance_status_to_str(n.status).to_string(),
            input_data: n.input_data.clone(),
            output_data: n.output_data.clone(),
            started_at: n.started_at,
            completed_at: n.completed_at,
        }
    }
}

impl TryFrom<NodeInstanceRow> for NodeInstance {
    type Error = WorkflowError;

    fn try_from(row: NodeInstanceRow) -> Result<Self> {
        Ok(NodeInstance {
            node_instance_id: row.node_instance_id.into(),
            workflow_instance_id: row.workflow_instance_id.into(),
            node_id: row.node_id.into(),
            status: node_instance_status_from_str(&row.status)?,
            input_data: row.input_data,
            output_data: row.output_data,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

pub fn node_instance_status_to_str(s: NodeInstanceStatus) -> &'static str {
    match s {
        NodeInstanceStatus::Pending => "pending",
        NodeInstanceStatus::Waiting => "waiting",
        NodeInstanceStatus::Running => "running",
        NodeInstanceStatus::Completed => "completed",
        NodeInstanceStatus::Failed => "failed",
        NodeInstanceStatus::Cancelled => "cancelled",
    }
}

pub fn node_instance_status_from_str(s: &str) -> Result<NodeInstanceStatus> {
    match s {
        "pending" => Ok(NodeInstanceStatus::Pending),
        "waiting" => Ok(NodeInstanceStatus::Waiting),
        "running" => Ok(NodeInstanceStatus::Running),
        "completed" => Ok(NodeInstanceStatus::Completed),
        "failed" => Ok(NodeInstanceStatus::Failed),
        "cancelled" => Ok(NodeInstanceStatus::Cancelled),
        other => Err(WorkflowError::data_parse(format!("unknown node instance status '{other}'"))),
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = task_instances)]
pub struct TaskInstanceRow {
    pub task_instance_id: Uuid,
    pub node_instance_id: Uuid,
    pub workflow_instance_id: Uuid,
    pub processor_id: Uuid,
    pub assigned_user_id: Option<Uuid>,
    pub status: String,
    pub priority: String,
    pub title: String,
    pub task_description: Option<String>,
    pub instructions: Option<String>,
    pub context_snapshot: serde_json::Value,
    pub result_data: Option<serde_json::Value>,
    pub result_summary: Option<String>,
    pub failure_reason: Option<String>,
    pub estimated_duration_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&TaskInstance> for TaskInstanceRow {
    fn from(t: &TaskInstance) -> Self {
        Self {
            task_instance_id: t.task_instance_id.into(),
            node_instance_id: t.node_instance_id.into(),
            workflow_instance_id: t.workflow_instance_id.into(),
            processor_id: t.processor_id.into(),
            assigned_user_id: t.assigned_user_id.map(Into::into),
            status: task_instance_status_to_str(t.status).to_string(),
            priority: task_priority_to_str(t.priority).to_string(),
            title: t.title.clone(),
            task_description: t.task_description.clone(),
            instructions: t.instructions.clone(),
            context_snapshot: t.context_snapshot.clone(),
            result_data: t.result_data.clone(),
            result_summary: t.result_summary.clone(),
            failure_reason: t.failure_reason.clone(),
            estimated_duration_secs: t.estimated_duration_secs,
            created_at: t.created_at,
            assigned_at: t.assigned_at,
            started_at: t.started_at,
            completed_at: t.completed_at,
        }
    }
}

impl TryFrom<TaskInstanceRow> for TaskInstance {
    type Error = WorkflowError;

    fn try_from(row: TaskInstanceRow) -> Result<Self> {
        Ok(TaskInstance {
            task_instance_id: row.task_instance_id.into(),
            node_instance_id: row.node_instance_id.into(),
            workflow_instance_id: row.workflow_instance_id.into(),
            processor_id: row.processor_id.into(),
            assigned_user_id: row.assigned_user_id.map(Into::into),
            status: task_instance_status_from_str(&row.status)?,
            priority: task_priority_from_str(&row.priority)?,
            title: row.title,
            task_description: row.task_description,
            instructions: row.instructions,
            context_snapshot: row.context_snapshot,
            result_data: row.result_data,
            result_summary: row.result_summary,
            failure_reason: row.failure_reason,
            estimated_duration_secs: row.estimated_duration_secs,
            created_at: row.created_at,
            assigned_at: row.assigned_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

pub fn task_instance_status_to_str(s: TaskInstanceStatus) -> &'static str {
    match s {
        TaskInstanceStatus::Pending => "pending",
        TaskInstanceStatus::Assigned => "assigned",
        TaskInstanceStatus::Waiting => "waiting",
        TaskInstanceStatus::InProgress => "in_progress",
        TaskInstanceStatus::Completed => "completed",
        TaskInstanceStatus::Failed => "failed",
        TaskInstanceStatus::Cancelled => "cancelled",
    }
}

pub fn task_instance_status_from_str(s: &str) -> Result<TaskInstanceStatus> {
    match s {
        "pending" => Ok(TaskInstanceStatus::Pending),
        "assigned" => Ok(TaskInstanceStatus::Assigned),
        "waiting" => Ok(TaskInstanceStatus::Waiting),
        "in_progress" => Ok(TaskInstanceStatus::InProgress),
        "completed" => Ok(TaskInstanceStatus::Completed),
        "failed" => Ok(TaskInstanceStatus::Failed),
        "cancelled" => Ok(TaskInstanceStatus::Cancelled),
        other => Err(WorkflowError::data_parse(format!("unknown task instance status '{other}'"))),
    }
}

fn task_priority_to_str(p: TaskPriority) -> &'static str {
    match p {
        TaskPriority::Low => "low",
        TaskPriority::Normal => "normal",
        TaskPriority::High => "high",
        TaskPriority::Urgent => "urgent",
    }
}

fn task_priority_from_str(s: &str) -> Result<TaskPriority> {
    match s {
        "low" => Ok(TaskPriority::Low),
        "normal" => Ok(TaskPriority::Normal),
        "high" => Ok(TaskPriority::High),
        "urgent" => Ok(TaskPriority::Urgent),
        other => Err(WorkflowError::data_parse(format!("unknown task priority '{other}'"))),
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = subdivisions)]
pub struct SubdivisionRow {
    pub subdivision_id: Uuid,
    pub original_task_id: Uuid,
    pub sub_workflow_base_id: Uuid,
    pub sub_workflow_instance_id: Option<Uuid>,
    pub parent_subdivision_id: Option<Uuid>,
    pub name: Option<String>,
    pub is_selected: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Subdivision> for SubdivisionRow {
    fn from(s: &Subdivision) -> Self {
        Self {
            subdivision_id: s.subdivision_id.into(),
            original_task_id: s.original_task_id.into(),
            sub_workflow_base_id: s.sub_workflow_base_id.into(),
            sub_workflow_instance_id: s.sub_workflow_instance_id.map(Into::into),
            parent_subdivision_id: s.parent_subdivision_id.map(Into::into),
            name: s.name.clone(),
            is_selected: s.is_selected,
            is_deleted: s.is_deleted,
            created_at: s.created_at,
        }
    }
}

impl From<SubdivisionRow> for Subdivision {
    fn from(row: SubdivisionRow) -> Self {
        Subdivision {
            subdivision_id: row.subdivision_id.into(),
            original_task_id: row.original_task_id.into(),
            sub_workflow_base_id: row.sub_workflow_base_id.into(),
            sub_workflow_instance_id: row.sub_workflow_instance_id.map(Into::into),
            parent_subdivision_id: row.parent_subdivision_id.map(Into::into),
            name: row.name,
            is_selected: row.is_selected,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = adoptions)]
pub struct AdoptionRow {
    pub adoption_id: Uuid,
    pub subdivision_id: Uuid,
    pub original_workflow_base_id: Uuid,
    pub new_workflow_id: Uuid,
    pub target_node_id: Uuid,
    pub adoption_name: Option<String>,
    pub new_node_ids: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&Adoption> for AdoptionRow {
    fn from(a: &Adoption) -> Self {
        Self {
            adoption_id: a.adoption_id.into(),
            subdivision_id: a.subdivision_id.into(),
            original_workflow_base_id: a.original_workflow_base_id.into(),
            new_workflow_id: a.new_workflow_id.into(),
            target_node_id: a.target_node_id.into(),
            adoption_name: a.adoption_name.clone(),
            new_node_ids: serde_json::to_value(&a.new_node_ids).unwrap_or(serde_json::Value::Null),
            created_at: a.created_at,
        }
    }
}

impl TryFrom<AdoptionRow> for Adoption {
    type Error = WorkflowError;

    fn try_from(row: AdoptionRow) -> Result<Self> {
        let new_node_ids: Vec<NodeId> = serde_json::from_value(row.new_node_ids)
            .map_err(|e| WorkflowError::data_parse(format!("adoption.new_node_ids: {e}")))?;
        Ok(Adoption {
            adoption_id: row.adoption_id.into(),
            subdivision_id: row.subdivision_id.into(),
            original_workflow_base_id: row.original_workflow_base_id.into(),
            new_workflow_id: row.new_workflow_id.into(),
            target_node_id: row.target_node_id.into(),
            adoption_name: row.adoption_name,
            new_node_ids,
            created_at: row.created_at,
        })
    }
}
