//! Agent/simulator task service (§4.6): routes a dispatched task by its
//! processor's kind. `Agent` runs a single structured call; `Simulator`
//! runs the bounded round loop in [`crate::simulator`]. Both funnel
//! back through [`check_node_completion`] (§4.7) on every terminal
//! transition, same as the human service.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use workflow_engine_core::error::retry::{retry_with_policy, RetryPolicy};
use workflow_engine_core::model::definition::{Processor, ProcessorKind};
use workflow_engine_core::model::instance::{TaskInstance, TaskInstanceStatus};
use workflow_engine_runtime::TaskDispatcher;
use workflow_engine_store::{InstanceRepository, TaskRepository};

use crate::client::AgentClient;
use crate::node_completion::check_node_completion;
use crate::simulator::SimulatorEngine;

/// Conversation length bound for simulator processors (§4.6). Fixed
/// rather than configurable per task: the original exposes it as a
/// service-level constant, not per-request.
const SIMULATOR_MAX_ROUNDS: u32 = 8;

pub struct AgentTaskService {
    tasks: Arc<dyn TaskRepository>,
    instances: Arc<dyn InstanceRepository>,
    engine: Arc<workflow_engine_runtime::ExecutionEngine>,
    client: Arc<dyn AgentClient>,
    retry_policy: RetryPolicy,
}

impl AgentTaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        instances: Arc<dyn InstanceRepository>,
        engine: Arc<workflow_engine_runtime::ExecutionEngine>,
        client: Arc<dyn AgentClient>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self { tasks, instances, engine, client, retry_policy }
    }

    fn build_prompt(task: &TaskInstance) -> String {
        format!(
            "Task: {}\nInstructions: {}\nUpstream context: {}",
            task.title,
            task.instructions.as_deref().unwrap_or(""),
            task.context_snapshot
        )
    }

    async fn run_agent(&self, mut task: TaskInstance, processor: &Processor) {
        let Some(agent_id) = processor.agent_id else {
            self.fail(task, "agent processor has no agent_id configured".into()).await;
            return;
        };

        task.status = TaskInstanceStatus::InProgress;
        task.started_at = Some(chrono::Utc::now());
        task = match self.tasks.update(task).await {
            Ok(t) => t,
            Err(err) => {
                error!(%err, "failed to mark agent task in progress");
                return;
            }
        };

        let prompt = Self::build_prompt(&task);
        let result = retry_with_policy(&self.retry_policy, || self.client.structured_call(agent_id, &prompt)).await;

        match result {
            Ok(value) => self.complete(task, value, None).await,
            Err(err) => self.fail(task, format!("agent call failed: {err}")).await,
        }
    }

    async fn run_simulator(&self, mut task: TaskInstance, processor: &Processor) {
        let (Some(weak_agent_id), Some(strong_agent_id)) = (processor.agent_id, processor.strong_agent_id) else {
            self.fail(task, "simulator processor is missing weak/strong agent ids".into()).await;
            return;
        };

        task.status = TaskInstanceStatus::InProgress;
        task.started_at = Some(chrono::Utc::now());
        task = match self.tasks.update(task).await {
            Ok(t) => t,
            Err(err) => {
                error!(%err, "failed to mark simulator task in progress");
                return;
            }
        };

        let task_description = task.instructions.clone().unwrap_or_else(|| task.title.clone());
        let simulator = SimulatorEngine::new(self.client.clone(), self.retry_policy.clone());
        let outcome = simulator.run(weak_agent_id, strong_agent_id, SIMULATOR_MAX_ROUNDS, &task_description).await;

        let result_data = json!({
            "session": outcome.session,
            "execution_result": outcome.execution_result,
        });

        match outcome.execution_result.result_data {
            Some(_) => self.complete(task, result_data, outcome.execution_result.decision_reasoning.into()).await,
            None => self.fail(task, outcome.execution_result.decision_reasoning).await,
        }
    }

    async fn complete(&self, mut task: TaskInstance, result_data: Value, result_summary: Option<String>) {
        let node_instance_id = task.node_instance_id;
        task.result_data = Some(result_data);
        task.result_summary = result_summary;
        if let Err(err) = task.transition_to(TaskInstanceStatus::Completed) {
            error!(%err, "agent task could not transition to completed");
            return;
        }
        if let Err(err) = self.tasks.update(task).await {
            error!(%err, "failed to persist completed agent task");
            return;
        }
        if let Err(err) = check_node_completion(&self.tasks, &self.instances, &self.engine, node_instance_id).await {
            error!(%err, "node completion check failed after agent task completed");
        }
    }

    async fn fail(&self, mut task: TaskInstance, reason: String) {
        let node_instance_id = task.node_instance_id;
        task.failure_reason = Some(reason);
        if let Err(err) = task.transition_to(TaskInstanceStatus::Failed) {
            error!(%err, "agent task could not transition to failed");
            return;
        }
        if let Err(err) = self.tasks.update(task).await {
            error!(%err, "failed to persist failed agent task");
            return;
        }
        if let Err(err) = check_node_completion(&self.tasks, &self.instances, &self.engine, node_instance_id).await {
            error!(%err, "node completion check failed after agent task failed");
        }
    }
}

#[async_trait::async_trait]
impl TaskDispatcher for AgentTaskService {
    async fn dispatch(&self, task: TaskInstance, processor: Processor) {
        match processor.kind {
            ProcessorKind::Agent => {
                info!(task_instance_id = %task.task_instance_id, "dispatching agent task");
                self.run_agent(task, &processor).await;
            }
            ProcessorKind::Simulator => {
                info!(task_instance_id = %task.task_instance_id, "dispatching simulator task");
                self.run_simulator(task, &processor).await;
            }
            ProcessorKind::Human | ProcessorKind::Mix => {
                error!(task_instance_id = %task.task_instance_id, "AgentTaskService cannot dispatch a human/mix processor");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use workflow_engine_core::ids::AgentId;
    use workflow_engine_core::model::definition::{NodeType, ProcessorBinding};
    use workflow_engine_core::model::instance::NodeInstanceStatus;
    use workflow_engine_core::testing::fixtures::straight_line_workflow;
    use workflow_engine_runtime::{ExecutionEngine, WorkflowContextManager};
    use workflow_engine_store::memory::{
        InMemoryInstanceRepository, InMemoryProcessorRepository, InMemorySubdivisionRepository, InMemoryTaskRepository,
        InMemoryWorkflowRepository,
    };
    use workflow_engine_store::WorkflowVersionGraph;

    struct ScriptedClient {
        structured_ok: bool,
    }

    #[async_trait]
    impl AgentClient for ScriptedClient {
        async fn structured_call(&self, _agent_id: AgentId, _prompt: &str) -> workflow_engine_core::error::Result<Value> {
            if self.structured_ok {
                Ok(json!({"answer": 42}))
            } else {
                Err(workflow_engine_core::error::WorkflowError::transient("down"))
            }
        }
        async fn free_form_call(&self, _agent_id: AgentId, _prompt: &str) -> workflow_engine_core::error::Result<String> {
            Ok("expert reply".into())
        }
        fn is_configured(&self, _agent_id: AgentId) -> bool {
            true
        }
    }

    struct RelayDispatcher {
        inner: Arc<std::sync::Mutex<Option<AgentTaskService>>>,
    }

    #[async_trait]
    impl TaskDispatcher for RelayDispatcher {
        async fn dispatch(&self, task: TaskInstance, processor: Processor) {
            let service = self.inner.lock().unwrap().take();
            if let Some(service) = service {
                service.dispatch(task, processor).await;
                *self.inner.lock().unwrap() = Some(service);
            }
        }
    }

    async fn setup(
        structured_ok: bool,
    ) -> (Arc<ExecutionEngine>, Arc<InMemoryTaskRepository>, Arc<InMemoryInstanceRepository>, workflow_engine_core::ids::WorkflowInstanceId)
    {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions = Arc::new(InMemorySubdivisionRepository::default());
        let workflows = Arc::new(InMemoryWorkflowRepository::new(instances.clone(), tasks.clone(), subdivisions));
        let processors = Arc::new(InMemoryProcessorRepository::default());

        let user_id = workflow_engine_core::ids::UserId::new();
        let (workflow, nodes, edges) = straight_line_workflow("S1", user_id);
        let workflow_base_id = workflow.workflow_base_id;
        let processor_node = nodes.iter().find(|n| n.node_type == NodeType::Processor).unwrap();
        let processor = Processor::new_agent("Scorer", AgentId::new());
        let processor_id = processor.processor_id;
        processors.create(processor).await.unwrap();
        let bindings = vec![ProcessorBinding { node_id: processor_node.node_id, processor_id }];
        workflows.create_initial(WorkflowVersionGraph { workflow, nodes, edges, bindings }).await.unwrap();

        let context = Arc::new(WorkflowContextManager::new(instances.clone()));
        let relay = Arc::new(std::sync::Mutex::new(None));
        let engine = Arc::new(ExecutionEngine::new(
            workflows,
            processors,
            instances.clone(),
            tasks.clone(),
            context,
            Arc::new(RelayDispatcher { inner: relay.clone() }),
        ));

        let client = Arc::new(ScriptedClient { structured_ok });
        let service = AgentTaskService::new(tasks.clone(), instances.clone(), engine.clone(), client, RetryPolicy::default());
        *relay.lock().unwrap() = Some(service);

        let workflow_instance_id = engine.start_instance(workflow_base_id, Value::Null, user_id, user_id, None).await.unwrap();
        (engine, tasks, instances, workflow_instance_id)
    }

    #[tokio::test]
    async fn successful_structured_call_completes_the_workflow() {
        let (_engine, tasks, instances, workflow_instance_id) = setup(true).await;
        let node_instances = instances.list_node_instances(workflow_instance_id).await.unwrap();
        let processor_node_instance =
            node_instances.iter().find(|n| n.status == NodeInstanceStatus::Completed).expect("processor node should have completed");
        let node_tasks = tasks.list_for_node(processor_node_instance.node_instance_id).await.unwrap();
        assert_eq!(node_tasks.len(), 1);
        assert_eq!(node_tasks[0].status, TaskInstanceStatus::Completed);
        assert_eq!(node_tasks[0].result_data, Some(json!({"answer": 42})));
    }

    #[tokio::test]
    async fn failing_structured_call_fails_the_task_and_the_workflow() {
        let (_engine, tasks, instances, workflow_instance_id) = setup(false).await;
        let node_instances = instances.list_node_instances(workflow_instance_id).await.unwrap();
        let processor_node_instance =
            node_instances.iter().find(|n| n.status == NodeInstanceStatus::Failed).expect("processor node should have failed");
        let node_tasks = tasks.list_for_node(processor_node_instance.node_instance_id).await.unwrap();
        assert_eq!(node_tasks[0].status, TaskInstanceStatus::Failed);
    }
}
