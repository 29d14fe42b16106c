//! Runtime (instance) counterparts of the definition types. Instances
//! are append-only: created by the engine, mutated only by the engine,
//! task services, and the context manager, never by the definition
//! editor.

use crate::error::{Result, WorkflowError};
use crate::ids::{NodeId, NodeInstanceId, ProcessorId, TaskInstanceId, UserId, WorkflowBaseId, WorkflowId, WorkflowInstanceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowInstanceStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowInstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub workflow_instance_id: WorkflowInstanceId,
    pub workflow_id: WorkflowId,
    pub workflow_base_id: WorkflowBaseId,
    pub executor_id: UserId,
    pub trigger_user_id: UserId,
    pub status: WorkflowInstanceStatus,
    pub input_data: Value,
    pub output_data: Option<Value>,
    pub instance_name: Option<String>,
    pub is_deleted: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    pub fn new(
        workflow_id: WorkflowId,
        workflow_base_id: WorkflowBaseId,
        executor_id: UserId,
        trigger_user_id: UserId,
        input_data: Value,
        instance_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            workflow_instance_id: WorkflowInstanceId::new(),
            workflow_id,
            workflow_base_id,
            executor_id,
            trigger_user_id,
            status: WorkflowInstanceStatus::Pending,
            input_data,
            output_data: None,
            instance_name,
            is_deleted: false,
            started_at: now,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Legal transitions: `pending -> running -> {paused <-> running, completed, failed, cancelled}`.
    pub fn transition_to(&mut self, next: WorkflowInstanceStatus) -> Result<()> {
        use WorkflowInstanceStatus::*;
        let legal = matches!(
            (self.status, next),
            (Pending, Running)
                | (Running, Paused)
                | (Paused, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Paused, Cancelled)
                | (Pending, Cancelled)
        );
        if !legal {
            return Err(WorkflowError::InvalidStateTransition {
                entity: format!("workflow_instance {}", self.workflow_instance_id),
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        if next.is_terminal() {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeInstanceStatus {
    Pending,
    Waiting,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl NodeInstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstance {
    pub node_instance_id: NodeInstanceId,
    pub workflow_instance_id: WorkflowInstanceId,
    pub node_id: NodeId,
    pub status: NodeInstanceStatus,
    pub input_data: Option<Value>,
    pub output_data: Option<Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NodeInstance {
    pub fn new(workflow_instance_id: WorkflowInstanceId, node_id: NodeId) -> Self {
        Self {
            node_instance_id: NodeInstanceId::new(),
            workflow_instance_id,
            node_id,
            status: NodeInstanceStatus::Pending,
            input_data: None,
            output_data: None,
            started_at: None,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskInstanceStatus {
    Pending,
    Assigned,
    Waiting,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskInstanceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// One unit of work dispatched to a processor for a given node
/// instance (one task per processor binding on that node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInstance {
    pub task_instance_id: TaskInstanceId,
    pub node_instance_id: NodeInstanceId,
    pub workflow_instance_id: WorkflowInstanceId,
    pub processor_id: ProcessorId,
    pub assigned_user_id: Option<UserId>,
    pub status: TaskInstanceStatus,
    pub title: String,
    pub task_description: Option<String>,
    pub instructions: Option<String>,
    /// Snapshot of the task context (§4.3 "task context retrieval") at
    /// dispatch time, serialized for storage.
    pub context_snapshot: Value,
    pub result_data: Option<Value>,
    pub result_summary: Option<String>,
    pub failure_reason: Option<String>,
    pub priority: TaskPriority,
    pub estimated_duration_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl TaskInstance {
    pub fn new(
        node_instance_id: NodeInstanceId,
        workflow_instance_id: WorkflowInstanceId,
        processor_id: ProcessorId,
        title: impl Into<String>,
        context_snapshot: Value,
    ) -> Self {
        Self {
            task_instance_id: TaskInstanceId::new(),
            node_instance_id,
            workflow_instance_id,
            processor_id,
            assigned_user_id: None,
            status: TaskInstanceStatus::Pending,
            title: title.into(),
            task_description: None,
            instructions: None,
            context_snapshot,
            result_data: None,
            result_summary: None,
            failure_reason: None,
            priority: TaskPriority::Normal,
            estimated_duration_secs: None,
            created_at: Utc::now(),
            assigned_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// `pending|assigned -> in_progress`, `in_progress -> assigned`
    /// (pause) is the only legal reverse edge; terminal states are
    /// reached only from `in_progress` (or directly from `pending`/
    /// `assigned` for reject/cancel).
    pub fn transition_to(&mut self, next: TaskInstanceStatus) -> Result<()> {
        use TaskInstanceStatus::*;
        let legal = matches!(
            (self.status, next),
            (Pending, Assigned)
                | (Pending, InProgress)
                | (Assigned, InProgress)
                | (InProgress, Assigned)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Pending, Failed)
                | (Assigned, Failed)
                | (InProgress, Cancelled)
                | (Pending, Cancelled)
                | (Assigned, Cancelled)
                | (Waiting, InProgress)
        );
        if !legal {
            return Err(WorkflowError::InvalidStateTransition {
                entity: format!("task_instance {}", self.task_instance_id),
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        let now = Utc::now();
        match next {
            Assigned if self.assigned_at.is_none() => self.assigned_at = Some(now),
            InProgress if self.started_at.is_none() => self.started_at = Some(now),
            _ => {}
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        self.status = next;
        Ok(())
    }

    /// `actual_duration`, computed on submit; a `None` reflects a
    /// missing timestamp (degrades gracefully per §4.5, never fatal).
    pub fn actual_duration_secs(&self) -> Option<i64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        Some((completed - started).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_instance_rejects_illegal_transition() {
        let mut instance = WorkflowInstance::new(
            WorkflowId::new(),
            WorkflowBaseId::new(),
            UserId::new(),
            UserId::new(),
            Value::Null,
            None,
        );
        assert!(instance.transition_to(WorkflowInstanceStatus::Completed).is_err());
        instance.transition_to(WorkflowInstanceStatus::Running).unwrap();
        instance.transition_to(WorkflowInstanceStatus::Completed).unwrap();
        assert!(instance.completed_at.is_some());
    }

    #[test]
    fn task_instance_supports_pause_reverse_edge() {
        let mut task = TaskInstance::new(
            NodeInstanceId::new(),
            WorkflowInstanceId::new(),
            ProcessorId::new(),
            "Review the draft",
            Value::Null,
        );
        task.transition_to(TaskInstanceStatus::Assigned).unwrap();
        task.transition_to(TaskInstanceStatus::InProgress).unwrap();
        task.transition_to(TaskInstanceStatus::Assigned).unwrap();
        assert_eq!(task.status, TaskInstanceStatus::Assigned);
    }

    #[test]
    fn submitting_a_completed_task_again_is_rejected() {
        let mut task = TaskInstance::new(
            NodeInstanceId::new(),
            WorkflowInstanceId::new(),
            ProcessorId::new(),
            "Review the draft",
            Value::Null,
        );
        task.transition_to(TaskInstanceStatus::InProgress).unwrap();
        task.transition_to(TaskInstanceStatus::Completed).unwrap();
        assert!(task.transition_to(TaskInstanceStatus::Completed).is_err());
    }

    #[test]
    fn duration_is_none_when_timestamps_are_missing() {
        let task = TaskInstance::new(
            NodeInstanceId::new(),
            WorkflowInstanceId::new(),
            ProcessorId::new(),
            "Review the draft",
            Value::Null,
        );
        assert!(task.actual_duration_secs().is_none());
    }
}
