//! Node-completion check (§4.7): invoked by every task service after a
//! task reaches a terminal status. No new locks beyond the context
//! manager's own instance lock (acquired inside `engine.complete_node`/
//! `fail_node`).

use serde_json::json;
use std::sync::Arc;

use workflow_engine_core::ids::NodeInstanceId;
use workflow_engine_core::model::instance::{NodeInstanceStatus, TaskInstanceStatus};
use workflow_engine_runtime::ExecutionEngine;
use workflow_engine_store::{InstanceRepository, TaskRepository};

use crate::error::TaskServiceResult;

pub async fn check_node_completion(
    tasks: &Arc<dyn TaskRepository>,
    instances: &Arc<dyn InstanceRepository>,
    engine: &ExecutionEngine,
    node_instance_id: NodeInstanceId,
) -> TaskServiceResult<()> {
    let node_tasks = tasks.list_for_node(node_instance_id).await?;
    if node_tasks.iter().any(|t| !t.status.is_terminal()) {
        return Ok(());
    }

    let mut node_instance = instances.get_node_instance(node_instance_id).await?;
    let any_failed = node_tasks.iter().any(|t| t.status == TaskInstanceStatus::Failed);
    let aggregated_output = json!({
        "tasks": node_tasks.iter().map(|t| json!({
            "task_instance_id": t.task_instance_id,
            "status": t.status,
            "result_data": t.result_data,
            "result_summary": t.result_summary,
        })).collect::<Vec<_>>(),
    });

    node_instance.status = if any_failed { NodeInstanceStatus::Failed } else { NodeInstanceStatus::Completed };
    node_instance.output_data = Some(aggregated_output.clone());
    node_instance.completed_at = Some(chrono::Utc::now());
    let workflow_instance_id = node_instance.workflow_instance_id;
    let node_id = node_instance.node_id;
    instances.update_node_instance(node_instance).await?;

    if any_failed {
        engine.fail_node(workflow_instance_id, node_id, "a bound task failed".into()).await?;
    } else {
        engine.complete_node(workflow_instance_id, node_id, aggregated_output).await?;
    }
    Ok(())
}
