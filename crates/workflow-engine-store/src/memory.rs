//! In-memory repository implementations, used by this crate's own
//! test suite and exported (behind the `test-util` feature) for other
//! crates' tests, mirroring the teacher's `testing/mocks.rs` pattern
//! but kept at the crate that actually owns persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use workflow_engine_core::ids::{
    AdoptionId, NodeId, NodeInstanceId, ProcessorId, SubdivisionId, TaskInstanceId, UserId, WorkflowBaseId,
    WorkflowId, WorkflowInstanceId,
};
use workflow_engine_core::model::definition::Processor;
use workflow_engine_core::model::instance::{NodeInstance, TaskInstance, TaskInstanceStatus, WorkflowInstance};
use workflow_engine_core::model::subdivision::{Adoption, Subdivision};

use crate::error::{StoreError, StoreResult};
use crate::repository::{
    CascadeDeleteReport, InstanceRepository, ProcessorRepository, SubdivisionRepository, TaskRepository,
    WorkflowRepository, WorkflowVersionGraph,
};

/// All versions of every workflow base id, keyed by `workflow_id`.
#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    versions: Arc<RwLock<HashMap<WorkflowId, WorkflowVersionGraph>>>,
    current: Arc<RwLock<HashMap<WorkflowBaseId, WorkflowId>>>,
    instances: Arc<InMemoryInstanceRepository>,
    tasks: Arc<InMemoryTaskRepository>,
    subdivisions: Arc<InMemorySubdivisionRepository>,
}

impl InMemoryWorkflowRepository {
    pub fn new(
        instances: Arc<InMemoryInstanceRepository>,
        tasks: Arc<InMemoryTaskRepository>,
        subdivisions: Arc<InMemorySubdivisionRepository>,
    ) -> Self {
        Self { versions: Arc::default(), current: Arc::default(), instances, tasks, subdivisions }
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn get_current(&self, workflow_base_id: WorkflowBaseId) -> StoreResult<WorkflowVersionGraph> {
        let current = self.current.read().await;
        let workflow_id = current
            .get(&workflow_base_id)
            .ok_or_else(|| StoreError::NotFound { entity: "workflow", id: workflow_base_id.to_string() })?;
        self.get_version(*workflow_id).await
    }

    async fn get_version(&self, workflow_id: WorkflowId) -> StoreResult<WorkflowVersionGraph> {
        self.versions
            .read()
            .await
            .get(&workflow_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { entity: "workflow_version", id: workflow_id.to_string() })
    }

    async fn create_initial(&self, graph: WorkflowVersionGraph) -> StoreResult<WorkflowVersionGraph> {
        let base_id = graph.workflow.workflow_base_id;
        let workflow_id = graph.workflow.workflow_id;
        let mut current = self.current.write().await;
        if current.contains_key(&base_id) {
            return Err(StoreError::DuplicateCurrentVersion { entity: "workflow", base_id: base_id.to_string() });
        }
        current.insert(base_id, workflow_id);
        self.versions.write().await.insert(workflow_id, graph.clone());
        Ok(graph)
    }

    async fn create_new_version(
        &self,
        workflow_base_id: WorkflowBaseId,
        next_version: WorkflowVersionGraph,
    ) -> StoreResult<WorkflowVersionGraph> {
        let mut current = self.current.write().await;
        let mut versions = self.versions.write().await;

        if let Some(old_id) = current.get(&workflow_base_id) {
            if let Some(old) = versions.get_mut(old_id) {
                old.workflow.is_current_version = false;
            }
        }
        current.insert(workflow_base_id, next_version.workflow.workflow_id);
        versions.insert(next_version.workflow.workflow_id, next_version.clone());
        Ok(next_version)
    }

    async fn cascade_delete(&self, workflow_base_id: WorkflowBaseId, hard: bool) -> StoreResult<CascadeDeleteReport> {
        let mut report = CascadeDeleteReport::default();
        let version_ids: Vec<WorkflowId> = {
            let versions = self.versions.read().await;
            versions.values().filter(|g| g.workflow.workflow_base_id == workflow_base_id).map(|g| g.workflow.workflow_id).collect()
        };

        let instance_ids = self.instances.instance_ids_for_workflows(&version_ids).await;
        for instance_id in &instance_ids {
            let node_instances = self.instances.list_node_instances(*instance_id).await?;
            for node_instance in &node_instances {
                let tasks = self.tasks.list_for_node(node_instance.node_instance_id).await?;
                report.task_instances_deleted += tasks.len();
                for task in &tasks {
                    let subs = self.subdivisions.list_for_task(task.task_instance_id).await?;
                    report.subdivisions_deleted += subs.len();
                }
            }
            report.node_instances_deleted += node_instances.len();
        }
        report.workflow_instances_deleted = instance_ids.len();

        if hard {
            self.instances.remove_workflows(&version_ids).await;
            let mut versions = self.versions.write().await;
            let mut current = self.current.write().await;
            versions.retain(|_, g| g.workflow.workflow_base_id != workflow_base_id);
            current.remove(&workflow_base_id);
        } else {
            let mut versions = self.versions.write().await;
            for graph in versions.values_mut() {
                if graph.workflow.workflow_base_id == workflow_base_id {
                    graph.workflow.is_deleted = true;
                }
            }
            self.instances.soft_delete_workflows(&version_ids).await;
        }

        Ok(report)
    }
}

#[derive(Default)]
pub struct InMemoryProcessorRepository {
    processors: Arc<RwLock<HashMap<ProcessorId, Processor>>>,
    bindings: Arc<RwLock<Vec<(NodeId, ProcessorId)>>>,
}

#[async_trait]
impl ProcessorRepository for InMemoryProcessorRepository {
    async fn get(&self, processor_id: ProcessorId) -> StoreResult<Processor> {
        self.processors
            .read()
            .await
            .get(&processor_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { entity: "processor", id: processor_id.to_string() })
    }

    async fn get_many(&self, ids: &[ProcessorId]) -> StoreResult<Vec<Processor>> {
        let processors = self.processors.read().await;
        ids.iter()
            .map(|id| {
                processors.get(id).cloned().ok_or_else(|| StoreError::NotFound { entity: "processor", id: id.to_string() })
            })
            .collect()
    }

    async fn create(&self, processor: Processor) -> StoreResult<Processor> {
        processor.validate().map_err(|e| StoreError::Database(e.to_string()))?;
        self.processors.write().await.insert(processor.processor_id, processor.clone());
        Ok(processor)
    }

    async fn clear_references(&self, processor_id: ProcessorId) -> StoreResult<usize> {
        let mut bindings = self.bindings.write().await;
        let before = bindings.len();
        bindings.retain(|(_, p)| *p != processor_id);
        Ok(before - bindings.len())
    }
}

#[derive(Default)]
pub struct InMemoryInstanceRepository {
    workflow_instances: Arc<RwLock<HashMap<WorkflowInstanceId, WorkflowInstance>>>,
    node_instances: Arc<RwLock<HashMap<NodeInstanceId, NodeInstance>>>,
}

impl InMemoryInstanceRepository {
    async fn instance_ids_for_workflows(&self, workflow_ids: &[WorkflowId]) -> Vec<WorkflowInstanceId> {
        self.workflow_instances
            .read()
            .await
            .values()
            .filter(|i| workflow_ids.contains(&i.workflow_id))
            .map(|i| i.workflow_instance_id)
            .collect()
    }

    async fn remove_workflows(&self, workflow_ids: &[WorkflowId]) {
        let ids = self.instance_ids_for_workflows(workflow_ids).await;
        self.workflow_instances.write().await.retain(|_, i| !ids.contains(&i.workflow_instance_id));
        self.node_instances.write().await.retain(|_, n| !ids.contains(&n.workflow_instance_id));
    }

    async fn soft_delete_workflows(&self, workflow_ids: &[WorkflowId]) {
        let mut instances = self.workflow_instances.write().await;
        for instance in instances.values_mut() {
            if workflow_ids.contains(&instance.workflow_id) {
                instance.is_deleted = true;
            }
        }
    }
}

#[async_trait]
impl InstanceRepository for InMemoryInstanceRepository {
    async fn create_workflow_instance(&self, instance: WorkflowInstance) -> StoreResult<WorkflowInstance> {
        self.workflow_instances.write().await.insert(instance.workflow_instance_id, instance.clone());
        Ok(instance)
    }

    async fn get_workflow_instance(&self, id: WorkflowInstanceId) -> StoreResult<WorkflowInstance> {
        self.workflow_instances
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { entity: "workflow_instance", id: id.to_string() })
    }

    async fn update_workflow_instance(&self, instance: WorkflowInstance) -> StoreResult<WorkflowInstance> {
        self.workflow_instances.write().await.insert(instance.workflow_instance_id, instance.clone());
        Ok(instance)
    }

    async fn create_node_instance(&self, instance: NodeInstance) -> StoreResult<NodeInstance> {
        self.node_instances.write().await.insert(instance.node_instance_id, instance.clone());
        Ok(instance)
    }

    async fn get_node_instance(&self, id: NodeInstanceId) -> StoreResult<NodeInstance> {
        self.node_instances
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { entity: "node_instance", id: id.to_string() })
    }

    async fn update_node_instance(&self, instance: NodeInstance) -> StoreResult<NodeInstance> {
        self.node_instances.write().await.insert(instance.node_instance_id, instance.clone());
        Ok(instance)
    }

    async fn list_node_instances(&self, workflow_instance_id: WorkflowInstanceId) -> StoreResult<Vec<NodeInstance>> {
        Ok(self
            .node_instances
            .read()
            .await
            .values()
            .filter(|n| n.workflow_instance_id == workflow_instance_id)
            .cloned()
            .collect())
    }

    async fn get_node_instance_by_node(
        &self,
        workflow_instance_id: WorkflowInstanceId,
        node_id: NodeId,
    ) -> StoreResult<NodeInstance> {
        self.node_instances
            .read()
            .await
            .values()
            .find(|n| n.workflow_instance_id == workflow_instance_id && n.node_id == node_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { entity: "node_instance", id: node_id.to_string() })
    }
}

#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<TaskInstanceId, TaskInstance>>>,
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: TaskInstance) -> StoreResult<TaskInstance> {
        self.tasks.write().await.insert(task.task_instance_id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: TaskInstanceId) -> StoreResult<TaskInstance> {
        self.tasks.read().await.get(&id).cloned().ok_or_else(|| StoreError::NotFound { entity: "task_instance", id: id.to_string() })
    }

    async fn update(&self, task: TaskInstance) -> StoreResult<TaskInstance> {
        self.tasks.write().await.insert(task.task_instance_id, task.clone());
        Ok(task)
    }

    async fn list_for_node(&self, node_instance_id: NodeInstanceId) -> StoreResult<Vec<TaskInstance>> {
        Ok(self.tasks.read().await.values().filter(|t| t.node_instance_id == node_instance_id).cloned().collect())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        status_filter: Option<TaskInstanceStatus>,
        limit: usize,
    ) -> StoreResult<Vec<TaskInstance>> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<TaskInstance> = tasks
            .values()
            .filter(|t| t.assigned_user_id == Some(user_id))
            .filter(|t| status_filter.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        matching.sort_by_key(|t| std::cmp::Reverse(t.created_at));
        matching.truncate(limit);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemorySubdivisionRepository {
    subdivisions: Arc<RwLock<HashMap<SubdivisionId, Subdivision>>>,
    adoptions: Arc<RwLock<HashMap<AdoptionId, Adoption>>>,
}

#[async_trait]
impl SubdivisionRepository for InMemorySubdivisionRepository {
    async fn create_subdivision(&self, subdivision: Subdivision) -> StoreResult<Subdivision> {
        self.subdivisions.write().await.insert(subdivision.subdivision_id, subdivision.clone());
        Ok(subdivision)
    }

    async fn get_subdivision(&self, id: SubdivisionId) -> StoreResult<Subdivision> {
        self.subdivisions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { entity: "subdivision", id: id.to_string() })
    }

    async fn update_subdivision(&self, subdivision: Subdivision) -> StoreResult<Subdivision> {
        self.subdivisions.write().await.insert(subdivision.subdivision_id, subdivision.clone());
        Ok(subdivision)
    }

    async fn list_for_task(&self, original_task_id: TaskInstanceId) -> StoreResult<Vec<Subdivision>> {
        Ok(self
            .subdivisions
            .read()
            .await
            .values()
            .filter(|s| s.original_task_id == original_task_id && !s.is_deleted)
            .cloned()
            .collect())
    }

    async fn deselect_siblings(&self, original_task_id: TaskInstanceId, keep: SubdivisionId) -> StoreResult<()> {
        let mut subdivisions = self.subdivisions.write().await;
        for sub in subdivisions.values_mut() {
            if sub.original_task_id == original_task_id && sub.subdivision_id != keep {
                sub.is_selected = false;
            }
        }
        Ok(())
    }

    async fn create_adoption(&self, adoption: Adoption) -> StoreResult<Adoption> {
        self.adoptions.write().await.insert(adoption.adoption_id, adoption.clone());
        Ok(adoption)
    }

    async fn list_adoptions_for_workflow(&self, workflow_base_id: WorkflowBaseId) -> StoreResult<Vec<Adoption>> {
        Ok(self
            .adoptions
            .read()
            .await
            .values()
            .filter(|a| a.original_workflow_base_id == workflow_base_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use workflow_engine_core::ids::WorkflowBaseId;
    use workflow_engine_core::model::definition::{NodeType, Workflow};

    fn sample_graph() -> WorkflowVersionGraph {
        let workflow_base_id = WorkflowBaseId::new();
        let workflow_id = WorkflowId::new();
        WorkflowVersionGraph {
            workflow: Workflow {
                workflow_base_id,
                workflow_id,
                version: 1,
                name: "Sample".into(),
                description: None,
                creator_id: UserId::new(),
                parent_version_id: None,
                change_note: None,
                is_current_version: true,
                is_deleted: false,
                created_at: Utc::now(),
            },
            nodes: vec![workflow_engine_core::model::definition::Node {
                node_base_id: Default::default(),
                node_id: NodeId::new(),
                workflow_id,
                node_type: NodeType::Start,
                name: "Start".into(),
                task_description: None,
                layout_hint: None,
            }],
            edges: vec![],
            bindings: vec![],
        }
    }

    #[tokio::test]
    async fn create_initial_then_get_current_round_trips() {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions = Arc::new(InMemorySubdivisionRepository::default());
        let repo = InMemoryWorkflowRepository::new(instances, tasks, subdivisions);

        let graph = sample_graph();
        let base_id = graph.workflow.workflow_base_id;
        repo.create_initial(graph.clone()).await.unwrap();

        let fetched = repo.get_current(base_id).await.unwrap();
        assert_eq!(fetched.workflow.workflow_id, graph.workflow.workflow_id);
    }

    #[tokio::test]
    async fn duplicate_initial_version_is_a_conflict() {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions = Arc::new(InMemorySubdivisionRepository::default());
        let repo = InMemoryWorkflowRepository::new(instances, tasks, subdivisions);

        let graph = sample_graph();
        repo.create_initial(graph.clone()).await.unwrap();
        let mut duplicate = graph.clone();
        duplicate.workflow.workflow_id = WorkflowId::new();
        let result = repo.create_initial(duplicate).await;
        assert!(matches!(result, Err(StoreError::DuplicateCurrentVersion { .. })));
    }

    #[tokio::test]
    async fn new_version_becomes_current_and_old_version_is_not() {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions = Arc::new(InMemorySubdivisionRepository::default());
        let repo = InMemoryWorkflowRepository::new(instances, tasks, subdivisions);

        let graph = sample_graph();
        let base_id = graph.workflow.workflow_base_id;
        repo.create_initial(graph.clone()).await.unwrap();

        let next = crate::versioning::next_version(&graph, Some("edit".into()));
        repo.create_new_version(base_id, next.clone()).await.unwrap();

        let current = repo.get_current(base_id).await.unwrap();
        assert_eq!(current.workflow.workflow_id, next.workflow.workflow_id);

        let old = repo.get_version(graph.workflow.workflow_id).await.unwrap();
        assert!(!old.workflow.is_current_version);
    }
}
