//! Execution engine (§4.4): drives an instance from creation to
//! terminal status. Task execution itself is delegated to a
//! [`TaskDispatcher`] the caller wires in, keeping this crate free of
//! a dependency on the human/agent task services (§9's "no two-way
//! imports" redesign flag, generalised from node-completion callbacks
//! to the dispatch direction too).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use workflow_engine_core::error::{Result, WorkflowError};
use workflow_engine_core::ids::{NodeId, NodeInstanceId, UserId, WorkflowBaseId, WorkflowInstanceId};
use workflow_engine_core::model::definition::{Node, NodeType, Processor};
use workflow_engine_core::model::instance::{NodeInstance, NodeInstanceStatus, TaskInstance, WorkflowInstance, WorkflowInstanceStatus};
use workflow_engine_store::{InstanceRepository, ProcessorRepository, TaskRepository, WorkflowRepository};

use crate::context_manager::{DerivedStatus, WorkflowContextManager};

/// Routes a freshly created task to the human or agent/simulator task
/// service by the bound processor's kind. The engine never interprets
/// task results itself.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, task: TaskInstance, processor: Processor);
}

pub struct ExecutionEngine {
    workflows: Arc<dyn WorkflowRepository>,
    processors: Arc<dyn ProcessorRepository>,
    instances: Arc<dyn InstanceRepository>,
    tasks: Arc<dyn TaskRepository>,
    context: Arc<WorkflowContextManager>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

impl ExecutionEngine {
    pub fn new(
        workflows: Arc<dyn WorkflowRepository>,
        processors: Arc<dyn ProcessorRepository>,
        instances: Arc<dyn InstanceRepository>,
        tasks: Arc<dyn TaskRepository>,
        context: Arc<WorkflowContextManager>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        Self { workflows, processors, instances, tasks, context, dispatcher }
    }

    /// Start-instance (§4.4).
    pub async fn start_instance(
        &self,
        workflow_base_id: WorkflowBaseId,
        input_data: Value,
        executor_id: UserId,
        trigger_user_id: UserId,
        instance_name: Option<String>,
    ) -> Result<WorkflowInstanceId> {
        let graph = self.workflows.get_current(workflow_base_id).await.map_err(WorkflowError::from)?;

        let mut instance = WorkflowInstance::new(
            graph.workflow.workflow_id,
            workflow_base_id,
            executor_id,
            trigger_user_id,
            input_data.clone(),
            instance_name,
        );
        instance = self.instances.create_workflow_instance(instance).await.map_err(WorkflowError::from)?;
        let workflow_instance_id = instance.workflow_instance_id;

        self.context.initialize(workflow_instance_id, input_data).await;

        let mut node_instance_ids: HashMap<NodeId, NodeInstanceId> = HashMap::new();
        for node in &graph.nodes {
            let node_instance = NodeInstance::new(workflow_instance_id, node.node_id);
            node_instance_ids.insert(node.node_id, node_instance.node_instance_id);
            self.instances.create_node_instance(node_instance).await.map_err(WorkflowError::from)?;
        }

        let mut upstream: HashMap<NodeId, Vec<NodeId>> = graph.nodes.iter().map(|n| (n.node_id, Vec::new())).collect();
        for edge in &graph.edges {
            upstream.entry(edge.to_node_id).or_default().push(edge.from_node_id);
        }

        for node in &graph.nodes {
            let node_instance_id = node_instance_ids[&node.node_id];
            self.context
                .register_dependency(workflow_instance_id, node_instance_id, node.node_id, upstream.remove(&node.node_id).unwrap_or_default())
                .await;
        }

        instance.transition_to(WorkflowInstanceStatus::Running)?;
        self.instances.update_workflow_instance(instance).await.map_err(WorkflowError::from)?;

        self.dispatch_ready(workflow_instance_id, &graph.nodes, &node_instance_ids).await?;

        Ok(workflow_instance_id)
    }

    async fn dispatch_ready(
        &self,
        workflow_instance_id: WorkflowInstanceId,
        nodes: &[Node],
        node_instance_ids: &HashMap<NodeId, NodeInstanceId>,
    ) -> Result<()> {
        let by_id: HashMap<NodeId, &Node> = nodes.iter().map(|n| (n.node_id, n)).collect();
        let instance_to_node: HashMap<NodeInstanceId, NodeId> = node_instance_ids.iter().map(|(n, i)| (*i, *n)).collect();

        let ready = self.context.drain_ready(workflow_instance_id).await;
        for node_instance_id in ready {
            let Some(&node_id) = instance_to_node.get(&node_instance_id) else { continue };
            let Some(node) = by_id.get(&node_id) else { continue };
            self.dispatch_node(workflow_instance_id, node, node_instance_id).await?;
        }
        Ok(())
    }

    /// Dispatch-node (§4.4): routes a ready node to task creation (for
    /// `processor` nodes) or end-node handling.
    async fn dispatch_node(&self, workflow_instance_id: WorkflowInstanceId, node: &Node, node_instance_id: NodeInstanceId) -> Result<()> {
        self.context.mark_executing(workflow_instance_id, node.node_id).await;

        match node.node_type {
            NodeType::Start => {
                let mut node_instance = self.instances.get_node_instance(node_instance_id).await.map_err(WorkflowError::from)?;
                node_instance.status = NodeInstanceStatus::Completed;
                node_instance.started_at = Some(chrono::Utc::now());
                node_instance.completed_at = Some(chrono::Utc::now());
                self.instances.update_node_instance(node_instance).await.map_err(WorkflowError::from)?;
                self.complete_node(workflow_instance_id, node.node_id, json!({"node": "start"})).await
            }
            NodeType::End => self.handle_end_node(workflow_instance_id, node, node_instance_id).await,
            NodeType::Processor => self.dispatch_processor_node(workflow_instance_id, node, node_instance_id).await,
        }
    }

    async fn dispatch_processor_node(&self, workflow_instance_id: WorkflowInstanceId, node: &Node, node_instance_id: NodeInstanceId) -> Result<()> {
        // Bindings live on the workflow version; the caller resolved them
        // at start_instance time via the graph, but dispatch can also be
        // re-entered from a downstream propagation, so we re-fetch the
        // current node instance's workflow version bindings via the
        // processor repository using the instance's recorded workflow id.
        let mut node_instance = self.instances.get_node_instance(node_instance_id).await.map_err(WorkflowError::from)?;
        let instance = self.instances.get_workflow_instance(workflow_instance_id).await.map_err(WorkflowError::from)?;
        let graph = self.workflows.get_version(instance.workflow_id).await.map_err(WorkflowError::from)?;
        let binding_processor_ids: Vec<_> = graph.bindings.iter().filter(|b| b.node_id == node.node_id).map(|b| b.processor_id).collect();

        node_instance.status = NodeInstanceStatus::Running;
        node_instance.started_at = Some(chrono::Utc::now());
        self.instances.update_node_instance(node_instance).await.map_err(WorkflowError::from)?;

        if binding_processor_ids.is_empty() {
            info!(%node_instance_id, "processor node has no bindings, completing with empty output");
            return self.complete_node(workflow_instance_id, node.node_id, Value::Null).await;
        }

        let processors = self.processors.get_many(&binding_processor_ids).await.map_err(WorkflowError::from)?;
        let upstream = self.context.upstream_context(workflow_instance_id, node_instance_id).await;
        let context_snapshot = serde_json::to_value(&upstream).unwrap_or(Value::Null);

        for processor in processors {
            let mut task = TaskInstance::new(
                node_instance_id,
                workflow_instance_id,
                processor.processor_id,
                format!("{} / {}", node.name, processor.name),
                context_snapshot.clone(),
            );
            task.task_description = node.task_description.clone();
            if let Some(user_id) = processor.user_id {
                task.assigned_user_id = Some(user_id);
                task.transition_to(workflow_engine_core::model::instance::TaskInstanceStatus::Assigned)?;
            }
            let task = self.tasks.create(task).await.map_err(WorkflowError::from)?;
            self.dispatcher.dispatch(task, processor).await;
        }

        Ok(())
    }

    /// End-node handling (§4.4): skip task creation, mark complete with
    /// the full execution summary collected from the context.
    async fn handle_end_node(&self, workflow_instance_id: WorkflowInstanceId, node: &Node, node_instance_id: NodeInstanceId) -> Result<()> {
        let snapshot = self.context.snapshot(workflow_instance_id).await;
        let summary = snapshot
            .map(|ctx| {
                json!({
                    "execution_path": ctx.execution_path,
                    "node_outputs": ctx.node_outputs,
                    "completed_nodes": ctx.completed_nodes.len(),
                    "failed_nodes": ctx.failed_nodes.len(),
                    "duration_secs": (chrono::Utc::now() - ctx.started_at).num_seconds(),
                })
            })
            .unwrap_or(Value::Null);

        let mut node_instance = self.instances.get_node_instance(node_instance_id).await.map_err(WorkflowError::from)?;
        node_instance.status = NodeInstanceStatus::Completed;
        node_instance.output_data = Some(summary.clone());
        node_instance.started_at.get_or_insert_with(chrono::Utc::now);
        node_instance.completed_at = Some(chrono::Utc::now());
        self.instances.update_node_instance(node_instance).await.map_err(WorkflowError::from)?;

        self.complete_node(workflow_instance_id, node.node_id, summary).await
    }

    /// Shared tail of every node-completion path: propagate through
    /// the context manager, dispatch anything newly ready, then check
    /// for overall completion.
    pub async fn complete_node(&self, workflow_instance_id: WorkflowInstanceId, node_id: NodeId, payload: Value) -> Result<()> {
        self.context.mark_completed(workflow_instance_id, node_id, payload).await;

        let instance = self.instances.get_workflow_instance(workflow_instance_id).await.map_err(WorkflowError::from)?;
        let graph = self.workflows.get_version(instance.workflow_id).await.map_err(WorkflowError::from)?;
        let node_instances = self.instances.list_node_instances(workflow_instance_id).await.map_err(WorkflowError::from)?;
        let node_instance_ids: HashMap<NodeId, NodeInstanceId> =
            node_instances.iter().map(|n| (n.node_id, n.node_instance_id)).collect();
        self.dispatch_ready(workflow_instance_id, &graph.nodes, &node_instance_ids).await?;

        self.finalize_if_terminal(workflow_instance_id).await
    }

    pub async fn fail_node(&self, workflow_instance_id: WorkflowInstanceId, node_id: NodeId, reason: String) -> Result<()> {
        self.context.mark_failed(workflow_instance_id, node_id, json!({"error": reason})).await;
        self.finalize_if_terminal(workflow_instance_id).await
    }

    async fn finalize_if_terminal(&self, workflow_instance_id: WorkflowInstanceId) -> Result<()> {
        let derived = self.context.check_workflow_completion(workflow_instance_id).await;
        let next_status = match derived {
            DerivedStatus::Completed => Some(WorkflowInstanceStatus::Completed),
            DerivedStatus::Failed => Some(WorkflowInstanceStatus::Failed),
            DerivedStatus::Running | DerivedStatus::Unknown => None,
        };
        let Some(next_status) = next_status else { return Ok(()) };

        let mut instance = self.instances.get_workflow_instance(workflow_instance_id).await.map_err(WorkflowError::from)?;
        if instance.status.is_terminal() {
            return Ok(());
        }
        let snapshot = self.context.snapshot(workflow_instance_id).await;
        instance.output_data = snapshot.map(|ctx| {
            json!({
                "completion_time": chrono::Utc::now(),
                "node_outputs": ctx.node_outputs,
                "execution_path": ctx.execution_path,
            })
        });
        instance.transition_to(next_status)?;
        self.instances.update_workflow_instance(instance).await.map_err(WorkflowError::from)?;

        self.context.cleanup_for_status(workflow_instance_id, next_status).await;
        Ok(())
    }

    /// Cancellation (§4.4/§5): cascades to every non-terminal node and
    /// task instance, then cleans the context.
    pub async fn cancel_instance(&self, workflow_instance_id: WorkflowInstanceId, reason: String) -> Result<usize> {
        let mut instance = self.instances.get_workflow_instance(workflow_instance_id).await.map_err(WorkflowError::from)?;
        instance.transition_to(WorkflowInstanceStatus::Cancelled)?;

        let node_instances = self.instances.list_node_instances(workflow_instance_id).await.map_err(WorkflowError::from)?;
        let mut cancelled_tasks = 0usize;
        for mut node_instance in node_instances {
            if node_instance.status.is_terminal() {
                continue;
            }
            node_instance.status = NodeInstanceStatus::Cancelled;
            node_instance.completed_at = Some(chrono::Utc::now());
            let node_instance_id = node_instance.node_instance_id;
            self.instances.update_node_instance(node_instance).await.map_err(WorkflowError::from)?;

            for mut task in self.tasks.list_for_node(node_instance_id).await.map_err(WorkflowError::from)? {
                if task.status.is_terminal() {
                    continue;
                }
                task.failure_reason = Some(reason.clone());
                task.transition_to(workflow_engine_core::model::instance::TaskInstanceStatus::Cancelled)?;
                self.tasks.update(task).await.map_err(WorkflowError::from)?;
                cancelled_tasks += 1;
            }
        }

        instance.output_data = Some(json!({"cancelled_reason": reason}));
        self.instances.update_workflow_instance(instance).await.map_err(WorkflowError::from)?;
        self.context.cleanup_for_status(workflow_instance_id, WorkflowInstanceStatus::Cancelled).await;

        Ok(cancelled_tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_engine_core::model::definition::ProcessorBinding;
    use workflow_engine_core::testing::fixtures::straight_line_workflow;
    use workflow_engine_store::memory::{
        InMemoryInstanceRepository, InMemoryProcessorRepository, InMemorySubdivisionRepository, InMemoryTaskRepository,
        InMemoryWorkflowRepository,
    };
    use workflow_engine_store::WorkflowVersionGraph;

    struct NoopDispatcher;

    #[async_trait]
    impl TaskDispatcher for NoopDispatcher {
        async fn dispatch(&self, _task: TaskInstance, _processor: Processor) {}
    }

    struct Fixture {
        engine: ExecutionEngine,
        instances: Arc<InMemoryInstanceRepository>,
        tasks: Arc<InMemoryTaskRepository>,
        workflow_base_id: WorkflowBaseId,
        user: UserId,
    }

    /// Builds a straight-line workflow, optionally binding a human
    /// processor to its single processor node so the node stalls on a
    /// pending task instead of completing immediately.
    async fn setup(bind_human_processor: bool) -> Fixture {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions = Arc::new(InMemorySubdivisionRepository::default());
        let workflows = Arc::new(InMemoryWorkflowRepository::new(instances.clone(), tasks.clone(), subdivisions));
        let processors = Arc::new(InMemoryProcessorRepository::default());

        let user = UserId::new();
        let (workflow, nodes, edges) = straight_line_workflow("S1", user);
        let workflow_base_id = workflow.workflow_base_id;

        let mut bindings = Vec::new();
        if bind_human_processor {
            let processor_node = nodes.iter().find(|n| n.node_type == NodeType::Processor).unwrap();
            let processor = Processor::new_human("Reviewer", user);
            let processor_id = processor.processor_id;
            processors.create(processor).await.unwrap();
            bindings.push(ProcessorBinding { node_id: processor_node.node_id, processor_id });
        }

        workflows.create_initial(WorkflowVersionGraph { workflow, nodes, edges, bindings }).await.unwrap();

        let context = Arc::new(WorkflowContextManager::new(instances.clone()));
        let dispatcher = Arc::new(NoopDispatcher);
        let engine = ExecutionEngine::new(workflows, processors, instances.clone(), tasks.clone(), context, dispatcher);
        Fixture { engine, instances, tasks, workflow_base_id, user }
    }

    #[tokio::test]
    async fn starting_an_instance_with_no_bindings_runs_straight_through_to_completion() {
        let fixture = setup(false).await;
        let workflow_instance_id = fixture
            .engine
            .start_instance(fixture.workflow_base_id, json!({"x": 1}), fixture.user, fixture.user, None)
            .await
            .unwrap();

        let instance = fixture.instances.get_workflow_instance(workflow_instance_id).await.unwrap();
        assert_eq!(instance.status, WorkflowInstanceStatus::Completed);

        let node_instances = fixture.instances.list_node_instances(workflow_instance_id).await.unwrap();
        assert!(node_instances.iter().all(|n| n.status == NodeInstanceStatus::Completed));
    }

    #[tokio::test]
    async fn cancel_before_completion_marks_pending_tasks_and_nodes_cancelled() {
        let fixture = setup(true).await;
        let workflow_instance_id = fixture
            .engine
            .start_instance(fixture.workflow_base_id, Value::Null, fixture.user, fixture.user, None)
            .await
            .unwrap();

        let instance = fixture.instances.get_workflow_instance(workflow_instance_id).await.unwrap();
        assert_eq!(instance.status, WorkflowInstanceStatus::Running);

        let cancelled = fixture.engine.cancel_instance(workflow_instance_id, "operator requested".into()).await.unwrap();
        assert_eq!(cancelled, 1);

        let instance = fixture.instances.get_workflow_instance(workflow_instance_id).await.unwrap();
        assert_eq!(instance.status, WorkflowInstanceStatus::Cancelled);

        let node_instances = fixture.instances.list_node_instances(workflow_instance_id).await.unwrap();
        let processor_node = node_instances.iter().find(|n| n.status != NodeInstanceStatus::Completed).unwrap();
        assert_eq!(processor_node.status, NodeInstanceStatus::Cancelled);

        let tasks = fixture.tasks.list_for_node(processor_node.node_instance_id).await.unwrap();
        assert_eq!(tasks[0].status, workflow_engine_core::model::instance::TaskInstanceStatus::Cancelled);
    }
}
