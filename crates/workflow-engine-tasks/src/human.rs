//! Human task service (§4.5): `pending → assigned → in_progress →
//! completed|failed|cancelled`, reverse edge `in_progress → assigned`
//! (pause) only. Every operation authorises against `assigned_user_id`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use workflow_engine_core::ids::{TaskInstanceId, UserId};
use workflow_engine_core::model::instance::{TaskInstance, TaskInstanceStatus};
use workflow_engine_runtime::{ExecutionEngine, UpstreamContext, WorkflowContextManager};
use workflow_engine_store::{InstanceRepository, TaskRepository};

use crate::error::{TaskServiceError, TaskServiceResult};
use crate::node_completion::check_node_completion;
use crate::priority::{estimated_deadline, priority_label};

/// §4.5 List-user-tasks enrichment: priority label, computed duration,
/// estimated deadline, alongside the raw row.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub task: TaskInstance,
    pub priority_label: &'static str,
    pub actual_duration_secs: Option<i64>,
    pub estimated_deadline: Option<DateTime<Utc>>,
}

impl TaskSummary {
    fn from_task(task: TaskInstance) -> Self {
        let priority_label = priority_label(task.priority);
        let actual_duration_secs = task.actual_duration_secs();
        let estimated_deadline = estimated_deadline(&task);
        Self { task, priority_label, actual_duration_secs, estimated_deadline }
    }
}

/// §4.5 Get-task-details: the task row plus the upstream context
/// bundle (§4.3) so the assignee can see upstream outputs.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetails {
    pub task: TaskInstance,
    pub upstream: Option<UpstreamContext>,
}

pub struct HumanTaskService {
    tasks: Arc<dyn TaskRepository>,
    instances: Arc<dyn InstanceRepository>,
    context: Arc<WorkflowContextManager>,
    engine: Arc<ExecutionEngine>,
}

impl HumanTaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        instances: Arc<dyn InstanceRepository>,
        context: Arc<WorkflowContextManager>,
        engine: Arc<ExecutionEngine>,
    ) -> Self {
        Self { tasks, instances, context, engine }
    }

    async fn load_owned(&self, task_id: TaskInstanceId, user_id: UserId) -> TaskServiceResult<TaskInstance> {
        let task = self.tasks.get(task_id).await?;
        if task.assigned_user_id != Some(user_id) {
            return Err(TaskServiceError::NotAuthorised { user_id: user_id.to_string(), task_id: task_id.to_string() });
        }
        Ok(task)
    }

    pub async fn list_user_tasks(
        &self,
        user_id: UserId,
        status_filter: Option<TaskInstanceStatus>,
        limit: usize,
    ) -> TaskServiceResult<Vec<TaskSummary>> {
        let tasks = self.tasks.list_for_user(user_id, status_filter, limit).await?;
        Ok(tasks.into_iter().map(TaskSummary::from_task).collect())
    }

    pub async fn get_task_details(&self, task_id: TaskInstanceId, user_id: UserId) -> TaskServiceResult<TaskDetails> {
        let task = self.load_owned(task_id, user_id).await?;
        let upstream = self.context.upstream_context(task.workflow_instance_id, task.node_instance_id).await;
        Ok(TaskDetails { task, upstream })
    }

    pub async fn start(&self, task_id: TaskInstanceId, user_id: UserId) -> TaskServiceResult<TaskInstance> {
        let mut task = self.load_owned(task_id, user_id).await?;
        task.transition_to(TaskInstanceStatus::InProgress)?;
        let task = self.tasks.update(task).await?;
        info!(%task_id, %user_id, "human task started");
        Ok(task)
    }

    pub async fn submit(
        &self,
        task_id: TaskInstanceId,
        user_id: UserId,
        result_data: Value,
        result_summary: Option<String>,
    ) -> TaskServiceResult<TaskInstance> {
        let mut task = self.load_owned(task_id, user_id).await?;
        task.transition_to(TaskInstanceStatus::Completed)?;
        task.result_data = Some(result_data);
        task.result_summary = result_summary;
        let task = self.tasks.update(task).await?;

        check_node_completion(&self.tasks, &self.instances, &self.engine, task.node_instance_id).await?;
        info!(%task_id, %user_id, "human task submitted");
        Ok(task)
    }

    pub async fn pause(&self, task_id: TaskInstanceId, user_id: UserId, reason: String) -> TaskServiceResult<TaskInstance> {
        let mut task = self.load_owned(task_id, user_id).await?;
        task.transition_to(TaskInstanceStatus::Assigned)?;
        task.failure_reason = Some(reason);
        let task = self.tasks.update(task).await?;
        Ok(task)
    }

    pub async fn reject(&self, task_id: TaskInstanceId, user_id: UserId, reason: String) -> TaskServiceResult<TaskInstance> {
        let mut task = self.load_owned(task_id, user_id).await?;
        task.transition_to(TaskInstanceStatus::Failed)?;
        task.failure_reason = Some(reason);
        let task = self.tasks.update(task).await?;

        check_node_completion(&self.tasks, &self.instances, &self.engine, task.node_instance_id).await?;
        info!(%task_id, %user_id, "human task rejected");
        Ok(task)
    }

    pub async fn cancel(&self, task_id: TaskInstanceId, user_id: UserId, reason: String) -> TaskServiceResult<TaskInstance> {
        let mut task = self.load_owned(task_id, user_id).await?;
        if task.status.is_terminal() {
            return Ok(task);
        }
        task.transition_to(TaskInstanceStatus::Cancelled)?;
        task.failure_reason = Some(reason);
        let task = self.tasks.update(task).await?;

        check_node_completion(&self.tasks, &self.instances, &self.engine, task.node_instance_id).await?;
        Ok(task)
    }

    /// Pure logging hook (§4.5): never mutates task state.
    pub async fn request_help(&self, task_id: TaskInstanceId, user_id: UserId, message: String) -> TaskServiceResult<()> {
        let _task = self.load_owned(task_id, user_id).await?;
        info!(%task_id, %user_id, %message, "assignee requested help");
        Ok(())
    }
}
