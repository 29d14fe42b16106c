//! Workflow context manager (§4.3): canonical per-instance runtime
//! state plus the per-instance lock that serialises every mutation to
//! it. Mirrors the teacher's `Mutex<HashMap<Uuid, Arc<Mutex<_>>>>`
//! lock-map idiom (see `db/events/caching.rs`'s layered cache guards)
//! generalised from a cache entry to a workflow instance's state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use workflow_engine_core::ids::{NodeId, NodeInstanceId, WorkflowInstanceId};
use workflow_engine_core::model::instance::{NodeInstanceStatus, WorkflowInstanceStatus};
use workflow_engine_store::InstanceRepository;

use crate::dependency_manager::DependencyManager;

/// In-memory runtime state for one workflow instance (§3 "Runtime context").
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub global_data: Value,
    pub node_outputs: HashMap<NodeId, Value>,
    pub execution_path: Vec<NodeId>,
    pub current_executing_nodes: HashSet<NodeId>,
    pub completed_nodes: HashSet<NodeId>,
    pub failed_nodes: HashSet<NodeId>,
    pub started_at: DateTime<Utc>,
}

impl WorkflowContext {
    fn new(global_data: Value) -> Self {
        Self {
            global_data,
            node_outputs: HashMap::new(),
            execution_path: Vec::new(),
            current_executing_nodes: HashSet::new(),
            completed_nodes: HashSet::new(),
            failed_nodes: HashSet::new(),
            started_at: Utc::now(),
        }
    }
}

struct InstanceState {
    context: WorkflowContext,
    dependencies: DependencyManager,
    registered_count: usize,
}

/// One-hop upstream bundle (§4.3 "upstream context retrieval").
#[derive(Debug, Clone, serde::Serialize)]
pub struct UpstreamContext {
    pub immediate_upstream_results: HashMap<NodeId, Value>,
    pub upstream_node_count: usize,
    pub execution_path: Vec<NodeId>,
    pub global_data: Value,
    pub execution_start_time: DateTime<Utc>,
}

/// Overall instance status as derived by the completion check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedStatus {
    Failed,
    Completed,
    Running,
    Unknown,
}

/// Owns every active instance's context and dependency state behind a
/// per-instance lock. One process-wide instance is shared by the
/// execution engine and the task services.
pub struct WorkflowContextManager {
    locks: AsyncMutex<HashMap<WorkflowInstanceId, Arc<AsyncMutex<InstanceState>>>>,
    instances: Arc<dyn InstanceRepository>,
}

impl WorkflowContextManager {
    pub fn new(instances: Arc<dyn InstanceRepository>) -> Self {
        Self { locks: AsyncMutex::new(HashMap::new()), instances }
    }

    async fn get_or_none(&self, workflow_instance_id: WorkflowInstanceId) -> Option<Arc<AsyncMutex<InstanceState>>> {
        self.locks.lock().await.get(&workflow_instance_id).cloned()
    }

    /// Creates an empty context and dependency map for a new instance.
    pub async fn initialize(&self, workflow_instance_id: WorkflowInstanceId, global_data: Value) {
        let mut locks = self.locks.lock().await;
        locks.entry(workflow_instance_id).or_insert_with(|| {
            Arc::new(AsyncMutex::new(InstanceState {
                context: WorkflowContext::new(global_data),
                dependencies: DependencyManager::new(),
                registered_count: 0,
            }))
        });
    }

    /// Registers one node instance's upstream set with the dependency
    /// manager (§4.2 Register). Returns `true` if the node is
    /// immediately ready (no upstream, i.e. a START node).
    pub async fn register_dependency(
        &self,
        workflow_instance_id: WorkflowInstanceId,
        node_instance_id: NodeInstanceId,
        node_id: NodeId,
        upstream_nodes: Vec<NodeId>,
    ) -> bool {
        let Some(state_lock) = self.get_or_none(workflow_instance_id).await else {
            warn!(%workflow_instance_id, "register_dependency on a context that was never initialized");
            return false;
        };
        let mut state = state_lock.lock().await;
        state.registered_count += 1;
        state.dependencies.register(node_instance_id, node_id, workflow_instance_id, upstream_nodes);
        state.dependencies.is_ready(node_instance_id)
    }

    /// Drains the ready set for dispatch (§4.2 Drain-ready).
    pub async fn drain_ready(&self, workflow_instance_id: WorkflowInstanceId) -> Vec<NodeInstanceId> {
        let Some(state_lock) = self.get_or_none(workflow_instance_id).await else { return Vec::new() };
        let mut state = state_lock.lock().await;
        state.dependencies.drain_ready(workflow_instance_id)
    }

    pub async fn mark_executing(&self, workflow_instance_id: WorkflowInstanceId, node_id: NodeId) {
        let Some(state_lock) = self.get_or_none(workflow_instance_id).await else {
            warn!(%workflow_instance_id, "mark_executing on a missing context; workflow already cleaned up");
            return;
        };
        let mut state = state_lock.lock().await;
        state.context.current_executing_nodes.insert(node_id);
    }

    /// Records a node's completion, updates execution path/outputs, and
    /// propagates the dependency manager -- all under the instance
    /// lock. Returns the node instances that became ready as a result,
    /// which the caller dispatches only after releasing the lock (this
    /// function already has released it by the time it returns).
    pub async fn mark_completed(
        &self,
        workflow_instance_id: WorkflowInstanceId,
        node_id: NodeId,
        payload: Value,
    ) -> Vec<NodeInstanceId> {
        let Some(state_lock) = self.get_or_none(workflow_instance_id).await else {
            warn!(%workflow_instance_id, "mark_completed on a missing context; workflow already cleaned up");
            return Vec::new();
        };
        let mut state = state_lock.lock().await;
        state.context.current_executing_nodes.remove(&node_id);
        state.context.completed_nodes.insert(node_id);
        state.context.execution_path.push(node_id);
        state.context.node_outputs.insert(node_id, payload);
        state.dependencies.mark_completed(workflow_instance_id, node_id)
    }

    pub async fn mark_failed(&self, workflow_instance_id: WorkflowInstanceId, node_id: NodeId, payload: Value) {
        let Some(state_lock) = self.get_or_none(workflow_instance_id).await else {
            warn!(%workflow_instance_id, "mark_failed on a missing context; workflow already cleaned up");
            return;
        };
        let mut state = state_lock.lock().await;
        state.context.current_executing_nodes.remove(&node_id);
        state.context.failed_nodes.insert(node_id);
        state.context.node_outputs.insert(node_id, payload);
    }

    /// One-hop upstream bundle for `node_instance_id`'s upstream set.
    pub async fn upstream_context(
        &self,
        workflow_instance_id: WorkflowInstanceId,
        node_instance_id: NodeInstanceId,
    ) -> Option<UpstreamContext> {
        let state_lock = self.get_or_none(workflow_instance_id).await?;
        let state = state_lock.lock().await;
        let entry = state.dependencies.entry(node_instance_id)?;
        let immediate_upstream_results = entry
            .upstream_nodes
            .iter()
            .filter_map(|id| state.context.node_outputs.get(id).map(|v| (*id, v.clone())))
            .collect();
        Some(UpstreamContext {
            immediate_upstream_results,
            upstream_node_count: entry.upstream_nodes.len(),
            execution_path: state.context.execution_path.clone(),
            global_data: state.context.global_data.clone(),
            execution_start_time: state.context.started_at,
        })
    }

    /// Snapshot of `node_outputs`/`execution_path` for the end-node's
    /// final output payload (§4.4 "end-node handling").
    pub async fn snapshot(&self, workflow_instance_id: WorkflowInstanceId) -> Option<WorkflowContext> {
        let state_lock = self.get_or_none(workflow_instance_id).await?;
        Some(state_lock.lock().await.context.clone())
    }

    /// Database verification pass plus in-memory counts (§4.3
    /// "check-workflow-completion"). `FAILED` takes priority; `COMPLETED`
    /// requires every registered node to be accounted for both
    /// in-memory and in the store.
    pub async fn check_workflow_completion(&self, workflow_instance_id: WorkflowInstanceId) -> DerivedStatus {
        let Some(state_lock) = self.get_or_none(workflow_instance_id).await else { return DerivedStatus::Unknown };
        let (failed, completed_count, registered_count) = {
            let state = state_lock.lock().await;
            (!state.context.failed_nodes.is_empty(), state.context.completed_nodes.len(), state.registered_count)
        };
        if failed {
            return DerivedStatus::Failed;
        }
        if completed_count < registered_count {
            return DerivedStatus::Running;
        }
        match self.instances.list_node_instances(workflow_instance_id).await {
            Ok(rows) => {
                let all_terminal_ok = rows
                    .iter()
                    .all(|n| matches!(n.status, NodeInstanceStatus::Completed | NodeInstanceStatus::Cancelled));
                if !rows.is_empty() && all_terminal_ok {
                    DerivedStatus::Completed
                } else {
                    DerivedStatus::Running
                }
            }
            Err(err) => {
                warn!(%workflow_instance_id, error = %err, "database verification pass failed; reporting unknown");
                DerivedStatus::Unknown
            }
        }
    }

    /// COMPLETED cleans up immediately; FAILED schedules a delayed
    /// cleanup so in-flight listeners can still observe the failure.
    pub async fn cleanup_for_status(self: &Arc<Self>, workflow_instance_id: WorkflowInstanceId, status: WorkflowInstanceStatus) {
        match status {
            WorkflowInstanceStatus::Completed | WorkflowInstanceStatus::Cancelled => {
                self.cleanup_now(workflow_instance_id).await;
            }
            WorkflowInstanceStatus::Failed => {
                let manager = Arc::clone(self);
                tokio::spawn(async move {
                    manager.delayed_cleanup(workflow_instance_id).await;
                });
            }
            _ => {}
        }
    }

    async fn delayed_cleanup(&self, workflow_instance_id: WorkflowInstanceId) {
        for round in 0..3 {
            tokio::time::sleep(Duration::from_secs(3)).await;
            let still_executing = match self.get_or_none(workflow_instance_id).await {
                Some(state_lock) => !state_lock.lock().await.context.current_executing_nodes.is_empty(),
                None => false,
            };
            if !still_executing || round == 2 {
                break;
            }
            debug!(%workflow_instance_id, round, "delaying failed-instance cleanup, executors still in flight");
        }
        self.cleanup_now(workflow_instance_id).await;
    }

    /// Removes the instance's context, dependency entries, and lock
    /// (invariant 7: no trace remains afterwards).
    pub async fn cleanup_now(&self, workflow_instance_id: WorkflowInstanceId) {
        self.locks.lock().await.remove(&workflow_instance_id);
    }
}
