//! Subdivision service (§4.8): nested sub-workflows spawned from a
//! running task, with select/adopt/hierarchy/cleanup operations.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use workflow_engine_core::ids::{NodeBaseId, NodeId, SubdivisionId, TaskInstanceId, UserId, WorkflowBaseId};
use workflow_engine_core::model::subdivision::{Adoption, Subdivision};
use workflow_engine_runtime::ExecutionEngine;
use workflow_engine_store::{versioning, SubdivisionRepository, TaskRepository, WorkflowRepository};

use crate::definition::{build_graph, SubWorkflowDefinition};
use crate::error::{SubdivisionServiceError, SubdivisionServiceResult};

pub struct SubdivisionService {
    tasks: Arc<dyn TaskRepository>,
    workflows: Arc<dyn WorkflowRepository>,
    subdivisions: Arc<dyn SubdivisionRepository>,
    engine: Arc<ExecutionEngine>,
}

/// Flattened subdivision tree for display (§4.8 Get-hierarchy). The
/// store only exposes ancestor lookup (`parent_subdivision_id`) and a
/// per-task listing, not an arbitrary children-of query, so the
/// "hierarchy" returned is the ancestor chain up to the root plus the
/// sibling set at the originating task -- see DESIGN.md.
#[derive(Debug, Clone, Serialize)]
pub struct SubdivisionHierarchy {
    pub root: Subdivision,
    pub ancestors: Vec<Subdivision>,
    pub siblings: Vec<Subdivision>,
}

impl SubdivisionService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        workflows: Arc<dyn WorkflowRepository>,
        subdivisions: Arc<dyn SubdivisionRepository>,
        engine: Arc<ExecutionEngine>,
    ) -> Self {
        Self { tasks, workflows, subdivisions, engine }
    }

    async fn assert_assignee(&self, task_id: TaskInstanceId, user_id: UserId) -> SubdivisionServiceResult<()> {
        let task = self.tasks.get(task_id).await?;
        if task.assigned_user_id != Some(user_id) {
            return Err(SubdivisionServiceError::NotAuthorised { user_id: user_id.to_string(), task_id: task_id.to_string() });
        }
        Ok(())
    }

    pub async fn create_subdivision(
        &self,
        original_task_id: TaskInstanceId,
        user_id: UserId,
        definition: &SubWorkflowDefinition,
        context_to_pass: Value,
        parent_subdivision_id: Option<SubdivisionId>,
        execute_immediately: bool,
    ) -> SubdivisionServiceResult<Subdivision> {
        self.assert_assignee(original_task_id, user_id).await?;

        let built = build_graph(definition, user_id)?;
        let workflow_base_id = built.workflow.workflow_base_id;
        let graph = self
            .workflows
            .create_initial(workflow_engine_store::WorkflowVersionGraph {
                workflow: built.workflow,
                nodes: built.nodes,
                edges: built.edges,
                bindings: Vec::new(),
            })
            .await?;

        let mut subdivision =
            Subdivision::new(original_task_id, workflow_base_id, parent_subdivision_id, Some(definition.name.clone()));

        if execute_immediately {
            let instance_id = self
                .engine
                .start_instance(workflow_base_id, context_to_pass, user_id, user_id, Some(definition.name.clone()))
                .await
                .map_err(SubdivisionServiceError::Core)?;
            subdivision.sub_workflow_instance_id = Some(instance_id);
        }

        let subdivision = self.subdivisions.create_subdivision(subdivision).await?;
        info!(%original_task_id, workflow_base_id = %graph.workflow.workflow_base_id, "subdivision created");
        Ok(subdivision)
    }

    /// §4.8 List-subdivisions: every subdivision spawned from a task,
    /// optionally restricted to the ones that were actually started.
    pub async fn list_for_task(&self, task_id: TaskInstanceId, with_instances_only: bool) -> SubdivisionServiceResult<Vec<Subdivision>> {
        let all = self.subdivisions.list_for_task(task_id).await?;
        Ok(if with_instances_only {
            all.into_iter().filter(|s| s.sub_workflow_instance_id.is_some()).collect()
        } else {
            all
        })
    }

    pub async fn select_subdivision(&self, subdivision_id: SubdivisionId, user_id: UserId) -> SubdivisionServiceResult<Subdivision> {
        let mut subdivision = self.subdivisions.get_subdivision(subdivision_id).await?;
        self.assert_assignee(subdivision.original_task_id, user_id).await?;

        subdivision.is_selected = true;
        let subdivision = self.subdivisions.update_subdivision(subdivision).await?;
        self.subdivisions.deselect_siblings(subdivision.original_task_id, subdivision_id).await?;
        Ok(subdivision)
    }

    /// `target_node_base_id` identifies the node by its version-stable
    /// base id (§4.1: `node_base_id` survives across versions), since
    /// the parent workflow may already be several versions past the one
    /// the caller last saw.
    pub async fn adopt_subdivision(
        &self,
        subdivision_id: SubdivisionId,
        original_workflow_base_id: WorkflowBaseId,
        target_node_base_id: NodeBaseId,
        adoption_name: Option<String>,
    ) -> SubdivisionServiceResult<Adoption> {
        let subdivision = self.subdivisions.get_subdivision(subdivision_id).await?;
        let sub_graph = self.workflows.get_current(subdivision.sub_workflow_base_id).await?;
        let parent_current = self.workflows.get_current(original_workflow_base_id).await?;

        let mut next = versioning::next_version(&parent_current, adoption_name.clone());
        let target_node_id: NodeId = next
            .nodes
            .iter()
            .find(|n| n.node_base_id == target_node_base_id)
            .map(|n| n.node_id)
            .ok_or_else(|| SubdivisionServiceError::InvalidDefinition(format!("no node with base id {target_node_base_id} in current version")))?;

        let added_node_ids =
            versioning::splice_subdivision(&mut next, target_node_id, sub_graph.nodes, sub_graph.edges).map_err(SubdivisionServiceError::Core)?;

        let new_graph = self.workflows.create_new_version(original_workflow_base_id, next).await?;

        let adoption = Adoption::new(
            subdivision_id,
            original_workflow_base_id,
            new_graph.workflow.workflow_id,
            target_node_id,
            adoption_name,
            added_node_ids,
        );
        let adoption = self.subdivisions.create_adoption(adoption).await?;
        info!(%subdivision_id, new_workflow_id = %adoption.new_workflow_id, "subdivision adopted");
        Ok(adoption)
    }

    pub async fn get_hierarchy(&self, subdivision_id: SubdivisionId) -> SubdivisionServiceResult<SubdivisionHierarchy> {
        let root = self.subdivisions.get_subdivision(subdivision_id).await?;

        let mut ancestors = Vec::new();
        let mut cursor = root.parent_subdivision_id;
        while let Some(parent_id) = cursor {
            let parent = self.subdivisions.get_subdivision(parent_id).await?;
            cursor = parent.parent_subdivision_id;
            ancestors.push(parent);
        }

        let siblings = self
            .subdivisions
            .list_for_task(root.original_task_id)
            .await?
            .into_iter()
            .filter(|s| s.subdivision_id != subdivision_id)
            .collect();

        Ok(SubdivisionHierarchy { root, ancestors, siblings })
    }

    /// Retains the selected subdivision plus the `keep_count` most
    /// recently created; soft-deletes the rest. Returns the number
    /// deleted.
    pub async fn cleanup_unselected(&self, task_id: TaskInstanceId, keep_count: usize) -> SubdivisionServiceResult<usize> {
        let mut all = self.subdivisions.list_for_task(task_id).await?;
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut deleted = 0usize;
        let mut retained_recent = 0usize;
        for mut subdivision in all {
            if subdivision.is_selected || retained_recent < keep_count {
                if !subdivision.is_selected {
                    retained_recent += 1;
                }
                continue;
            }
            subdivision.is_deleted = true;
            self.subdivisions.update_subdivision(subdivision).await?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{SubWorkflowEdgeSpec, SubWorkflowNodeSpec};
    use workflow_engine_core::model::definition::{EdgeType, NodeType, Processor, ProcessorBinding};
    use workflow_engine_core::model::instance::TaskInstance;
    use workflow_engine_core::testing::fixtures::straight_line_workflow;
    use workflow_engine_runtime::{TaskDispatcher, WorkflowContextManager};
    use workflow_engine_store::memory::{
        InMemoryInstanceRepository, InMemoryProcessorRepository, InMemorySubdivisionRepository, InMemoryTaskRepository,
        InMemoryWorkflowRepository,
    };
    use workflow_engine_store::WorkflowVersionGraph;

    struct NoopDispatcher;
    #[async_trait::async_trait]
    impl TaskDispatcher for NoopDispatcher {
        async fn dispatch(&self, _task: TaskInstance, _processor: Processor) {}
    }

    fn sub_definition() -> SubWorkflowDefinition {
        SubWorkflowDefinition {
            name: "Sub".into(),
            description: None,
            nodes: vec![
                SubWorkflowNodeSpec { temp_id: 1, name: "S".into(), node_type: NodeType::Start, task_description: None },
                SubWorkflowNodeSpec { temp_id: 2, name: "P".into(), node_type: NodeType::Processor, task_description: None },
                SubWorkflowNodeSpec { temp_id: 3, name: "E".into(), node_type: NodeType::End, task_description: None },
            ],
            edges: vec![
                SubWorkflowEdgeSpec { from_temp_id: 1, to_temp_id: 2, edge_type: EdgeType::Normal },
                SubWorkflowEdgeSpec { from_temp_id: 2, to_temp_id: 3, edge_type: EdgeType::Normal },
            ],
        }
    }

    async fn setup() -> (
        SubdivisionService,
        Arc<InMemoryTaskRepository>,
        Arc<InMemoryWorkflowRepository>,
        UserId,
        TaskInstanceId,
        workflow_engine_core::ids::WorkflowBaseId,
        NodeBaseId,
    ) {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions = Arc::new(InMemorySubdivisionRepository::default());
        let workflows = Arc::new(InMemoryWorkflowRepository::new(instances.clone(), tasks.clone(), subdivisions.clone()));
        let processors = Arc::new(InMemoryProcessorRepository::default());

        let user_id = UserId::new();
        let (workflow, nodes, edges) = straight_line_workflow("Parent", user_id);
        let workflow_base_id = workflow.workflow_base_id;
        let processor_node = nodes.iter().find(|n| n.node_type == NodeType::Processor).unwrap();
        let target_node_base_id = processor_node.node_base_id;
        let processor = Processor::new_human("Reviewer", user_id);
        let processor_id = processor.processor_id;
        processors.create(processor).await.unwrap();
        let bindings = vec![ProcessorBinding { node_id: processor_node.node_id, processor_id }];
        workflows.create_initial(WorkflowVersionGraph { workflow, nodes, edges, bindings }).await.unwrap();

        let context = Arc::new(WorkflowContextManager::new(instances.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            workflows.clone(),
            processors,
            instances.clone(),
            tasks.clone(),
            context,
            Arc::new(NoopDispatcher),
        ));

        let workflow_instance_id =
            engine.start_instance(workflow_base_id, Value::Null, user_id, user_id, None).await.unwrap();
        let node_instances = instances.list_node_instances(workflow_instance_id).await.unwrap();
        let processor_node_instance = node_instances
            .iter()
            .find(|n| n.status == workflow_engine_core::model::instance::NodeInstanceStatus::Running)
            .unwrap();
        let pending_tasks = tasks.list_for_node(processor_node_instance.node_instance_id).await.unwrap();
        let task_id = pending_tasks[0].task_instance_id;

        let service = SubdivisionService::new(tasks.clone(), workflows.clone(), subdivisions, engine);
        (service, tasks, workflows, user_id, task_id, workflow_base_id, target_node_base_id)
    }

    #[tokio::test]
    async fn creating_a_subdivision_as_a_non_assignee_is_rejected() {
        let (service, _tasks, _workflows, _user_id, task_id, _base_id, _target) = setup().await;
        let result = service.create_subdivision(task_id, UserId::new(), &sub_definition(), Value::Null, None, false).await;
        assert!(matches!(result, Err(SubdivisionServiceError::NotAuthorised { .. })));
    }

    #[tokio::test]
    async fn create_then_select_then_adopt_produces_a_new_parent_version() {
        let (service, _tasks, workflows, user_id, task_id, workflow_base_id, target_node_base_id) = setup().await;

        let subdivision = service.create_subdivision(task_id, user_id, &sub_definition(), Value::Null, None, false).await.unwrap();
        let selected = service.select_subdivision(subdivision.subdivision_id, user_id).await.unwrap();
        assert!(selected.is_selected);

        let adoption = service
            .adopt_subdivision(selected.subdivision_id, workflow_base_id, target_node_base_id, Some("merge".into()))
            .await
            .unwrap();

        assert_eq!(adoption.new_node_ids.len(), 1);
        let current = workflows.get_current(workflow_base_id).await.unwrap();
        assert_eq!(current.workflow.version, 2);
        assert!(!current.nodes.iter().any(|n| n.node_base_id == target_node_base_id));
    }

    #[tokio::test]
    async fn cleanup_keeps_the_selected_one_and_the_most_recent() {
        let (service, _tasks, _workflows, user_id, task_id, _base_id, _target) = setup().await;

        let mut created = Vec::new();
        for _ in 0..4 {
            let subdivision = service.create_subdivision(task_id, user_id, &sub_definition(), Value::Null, None, false).await.unwrap();
            created.push(subdivision);
        }
        service.select_subdivision(created[0].subdivision_id, user_id).await.unwrap();

        let deleted = service.cleanup_unselected(task_id, 1).await.unwrap();
        assert_eq!(deleted, 2);
    }
}
