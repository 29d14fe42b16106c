//! Postgres-backed repository implementations. Diesel is synchronous,
//! so every call is shelled out to a blocking thread the way the
//! teacher's `ServiceConnectionPool` wraps r2d2 for an async caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use workflow_engine_core::ids::{
    NodeId, NodeInstanceId, ProcessorId, SubdivisionId, TaskInstanceId, UserId, WorkflowBaseId, WorkflowId,
    WorkflowInstanceId,
};
use workflow_engine_core::model::definition::Processor;
use workflow_engine_core::model::instance::{NodeInstance, TaskInstance, TaskInstanceStatus, WorkflowInstance};
use workflow_engine_core::model::subdivision::{Adoption, Subdivision};

use crate::error::{StoreError, StoreResult};
use crate::repository::{
    CascadeDeleteReport, InstanceRepository, ProcessorRepository, SubdivisionRepository, TaskRepository,
    WorkflowRepository, WorkflowVersionGraph,
};
use crate::rows::{
    task_instance_status_to_str, AdoptionRow, EdgeRow, NodeInstanceRow, NodeRow, ProcessorRow, SubdivisionRow,
    TaskInstanceRow, WorkflowInstanceRow, WorkflowRow,
};
use crate::schema;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Builds the r2d2/diesel pool, mirroring `ServicePoolConfig`'s sizing
/// knobs without the multi-tenant routing this system has no use for.
pub fn build_pool(database_url: &str, max_connections: u32) -> StoreResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_connections)
        .connection_timeout(Duration::from_secs(30))
        .test_on_check_out(true)
        .build(manager)
        .map_err(|e| StoreError::Pool(e.to_string()))
}

async fn with_conn<F, T>(pool: &PgPool, f: F) -> StoreResult<T>
where
    F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(StoreError::from)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| StoreError::Database(format!("blocking task panicked: {e}")))?
}

fn load_graph(conn: &mut PgConnection, workflow: WorkflowRow) -> StoreResult<WorkflowVersionGraph> {
    use schema::{edges, nodes, processor_bindings};

    let node_rows: Vec<NodeRow> = nodes::table.filter(nodes::workflow_id.eq(workflow.workflow_id)).load(conn)?;
    let edge_rows: Vec<EdgeRow> = edges::table.filter(edges::workflow_id.eq(workflow.workflow_id)).load(conn)?;
    let binding_rows: Vec<(uuid::Uuid, uuid::Uuid)> = processor_bindings::table
        .filter(processor_bindings::node_id.eq_any(node_rows.iter().map(|n| n.node_id)))
        .select((processor_bindings::node_id, processor_bindings::processor_id))
        .load(conn)?;

    let nodes = node_rows.into_iter().map(TryInto::try_into).collect::<workflow_engine_core::error::Result<Vec<_>>>()?;
    let edges = edge_rows.into_iter().map(TryInto::try_into).collect::<workflow_engine_core::error::Result<Vec<_>>>()?;
    let bindings = binding_rows
        .into_iter()
        .map(|(node_id, processor_id)| workflow_engine_core::model::definition::ProcessorBinding {
            node_id: node_id.into(),
            processor_id: processor_id.into(),
        })
        .collect();

    Ok(WorkflowVersionGraph { workflow: workflow.try_into()?, nodes, edges, bindings })
}

fn persist_graph(conn: &mut PgConnection, graph: &WorkflowVersionGraph) -> StoreResult<()> {
    use schema::{edges, nodes, processor_bindings, workflows};

    diesel::insert_into(workflows::table).values(WorkflowRow::from(&graph.workflow)).execute(conn)?;
    let node_rows: Vec<NodeRow> = graph.nodes.iter().map(NodeRow::from).collect();
    if !node_rows.is_empty() {
        diesel::insert_into(nodes::table).values(&node_rows).execute(conn)?;
    }
    let edge_rows: Vec<EdgeRow> = graph.edges.iter().map(EdgeRow::from).collect();
    if !edge_rows.is_empty() {
        diesel::insert_into(edges::table).values(&edge_rows).execute(conn)?;
    }
    for binding in &graph.bindings {
        diesel::insert_into(processor_bindings::table)
            .values((
                processor_bindings::node_id.eq(uuid::Uuid::from(binding.node_id)),
                processor_bindings::processor_id.eq(uuid::Uuid::from(binding.processor_id)),
            ))
            .execute(conn)?;
    }
    Ok(())
}

pub struct PgWorkflowRepository {
    pool: PgPool,
}

impl PgWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowRepository for PgWorkflowRepository {
    async fn get_current(&self, workflow_base_id: WorkflowBaseId) -> StoreResult<WorkflowVersionGraph> {
        use schema::workflows;

        with_conn(&self.pool, move |conn| {
            let row: WorkflowRow = workflows::table
                .filter(workflows::workflow_base_id.eq(uuid::Uuid::from(workflow_base_id)))
                .filter(workflows::is_current_version.eq(true))
                .filter(workflows::is_deleted.eq(false))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => {
                        StoreError::NotFound { entity: "workflow", id: workflow_base_id.to_string() }
                    }
                    other => other.into(),
                })?;
            load_graph(conn, row)
        })
        .await
    }

    async fn get_version(&self, workflow_id: WorkflowId) -> StoreResult<WorkflowVersionGraph> {
        use schema::workflows;

        with_conn(&self.pool, move |conn| {
            let row: WorkflowRow = workflows::table
                .filter(workflows::workflow_id.eq(uuid::Uuid::from(workflow_id)))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => {
                        StoreError::NotFound { entity: "workflow_version", id: workflow_id.to_string() }
                    }
                    other => other.into(),
                })?;
            load_graph(conn, row)
        })
        .await
    }

    async fn create_initial(&self, graph: WorkflowVersionGraph) -> StoreResult<WorkflowVersionGraph> {
        use schema::workflows;

        with_conn(&self.pool, move |conn| {
            conn.transaction(|conn| {
                let base_id = uuid::Uuid::from(graph.workflow.workflow_base_id);
                let existing: i64 = workflows::table
                    .filter(workflows::workflow_base_id.eq(base_id))
                    .count()
                    .get_result(conn)
                    .map_err(StoreError::from)?;
                if existing > 0 {
                    return Err(StoreError::DuplicateCurrentVersion {
                        entity: "workflow",
                        base_id: graph.workflow.workflow_base_id.to_string(),
                    });
                }
                persist_graph(conn, &graph)?;
                Ok(graph)
            })
        })
        .await
    }

    async fn create_new_version(
        &self,
        workflow_base_id: WorkflowBaseId,
        next_version: WorkflowVersionGraph,
    ) -> StoreResult<WorkflowVersionGraph> {
        use schema::workflows;

        with_conn(&self.pool, move |conn| {
            conn.transaction(|conn| {
                diesel::update(
                    workflows::table
                        .filter(workflows::workflow_base_id.eq(uuid::Uuid::from(workflow_base_id)))
                        .filter(workflows::is_current_version.eq(true)),
                )
                .set(workflows::is_current_version.eq(false))
                .execute(conn)
                .map_err(StoreError::from)?;
                persist_graph(conn, &next_version)?;
                Ok(next_version)
            })
        })
        .await
    }

    async fn cascade_delete(&self, workflow_base_id: WorkflowBaseId, hard: bool) -> StoreResult<CascadeDeleteReport> {
        use schema::{node_instances, subdivisions, task_instances, workflow_instances, workflows};

        with_conn(&self.pool, move |conn| {
            conn.transaction(|conn| {
                let base_id = uuid::Uuid::from(workflow_base_id);
                let instance_ids: Vec<uuid::Uuid> = workflow_instances::table
                    .filter(workflow_instances::workflow_base_id.eq(base_id))
                    .select(workflow_instances::workflow_instance_id)
                    .load(conn)
                    .map_err(StoreError::from)?;

                let node_instance_ids: Vec<uuid::Uuid> = node_instances::table
                    .filter(node_instances::workflow_instance_id.eq_any(&instance_ids))
                    .select(node_instances::node_instance_id)
                    .load(conn)
                    .map_err(StoreError::from)?;

                let task_instance_ids: Vec<uuid::Uuid> = task_instances::table
                    .filter(task_instances::node_instance_id.eq_any(&node_instance_ids))
                    .select(task_instances::task_instance_id)
                    .load(conn)
                    .map_err(StoreError::from)?;

                let subdivisions_deleted: i64 = subdivisions::table
                    .filter(subdivisions::original_task_id.eq_any(&task_instance_ids))
                    .count()
                    .get_result(conn)
                    .map_err(StoreError::from)?;

                let report = CascadeDeleteReport {
                    workflow_instances_deleted: instance_ids.len(),
                    node_instances_deleted: node_instance_ids.len(),
                    task_instances_deleted: task_instance_ids.len(),
                    subdivisions_deleted: subdivisions_deleted as usize,
                };

                if hard {
                    diesel::delete(subdivisions::table.filter(subdivisions::original_task_id.eq_any(&task_instance_ids)))
                        .execute(conn)
                        .map_err(StoreError::from)?;
                    diesel::delete(task_instances::table.filter(task_instances::task_instance_id.eq_any(&task_instance_ids)))
                        .execute(conn)
                        .map_err(StoreError::from)?;
                    diesel::delete(node_instances::table.filter(node_instances::node_instance_id.eq_any(&node_instance_ids)))
                        .execute(conn)
                        .map_err(StoreError::from)?;
                    diesel::delete(workflow_instances::table.filter(workflow_instances::workflow_instance_id.eq_any(&instance_ids)))
                        .execute(conn)
                        .map_err(StoreError::from)?;
                    diesel::delete(workflows::table.filter(workflows::workflow_base_id.eq(base_id)))
                        .execute(conn)
                        .map_err(StoreError::from)?;
                } else {
                    diesel::update(workflows::table.filter(workflows::workflow_base_id.eq(base_id)))
                        .set(workflows::is_deleted.eq(true))
                        .execute(conn)
                        .map_err(StoreError::from)?;
                    diesel::update(workflow_instances::table.filter(workflow_instances::workflow_instance_id.eq_any(&instance_ids)))
                        .set(workflow_instances::is_deleted.eq(true))
                        .execute(conn)
                        .map_err(StoreError::from)?;
                }

                Ok(report)
            })
        })
        .await
    }
}

pub struct PgProcessorRepository {
    pool: PgPool,
}

impl PgProcessorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessorRepository for PgProcessorRepository {
    async fn get(&self, processor_id: ProcessorId) -> StoreResult<Processor> {
        use schema::processors;

        with_conn(&self.pool, move |conn| {
            let row: ProcessorRow = processors::table
                .filter(processors::processor_id.eq(uuid::Uuid::from(processor_id)))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => {
                        StoreError::NotFound { entity: "processor", id: processor_id.to_string() }
                    }
                    other => other.into(),
                })?;
            Ok(row.try_into()?)
        })
        .await
    }

    async fn get_many(&self, ids: &[ProcessorId]) -> StoreResult<Vec<Processor>> {
        use schema::processors;

        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| (*id).into()).collect();
        with_conn(&self.pool, move |conn| {
            let rows: Vec<ProcessorRow> = processors::table.filter(processors::processor_id.eq_any(&ids)).load(conn)?;
            rows.into_iter().map(TryInto::try_into).collect::<workflow_engine_core::error::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn create(&self, processor: Processor) -> StoreResult<Processor> {
        use schema::processors;

        processor.validate().map_err(|e| StoreError::Database(e.to_string()))?;
        with_conn(&self.pool, move |conn| {
            diesel::insert_into(processors::table).values(ProcessorRow::from(&processor)).execute(conn)?;
            Ok(processor)
        })
        .await
    }

    async fn clear_references(&self, processor_id: ProcessorId) -> StoreResult<usize> {
        use schema::processor_bindings;

        with_conn(&self.pool, move |conn| {
            let deleted = diesel::delete(
                processor_bindings::table.filter(processor_bindings::processor_id.eq(uuid::Uuid::from(processor_id))),
            )
            .execute(conn)?;
            Ok(deleted)
        })
        .await
    }
}

pub struct PgInstanceRepository {
    pool: PgPool,
}

impl PgInstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstanceRepository for PgInstanceRepository {
    async fn create_workflow_instance(&self, instance: WorkflowInstance) -> StoreResult<WorkflowInstance> {
        use schema::workflow_instances;

        with_conn(&self.pool, move |conn| {
            diesel::insert_into(workflow_instances::table)
                .values(WorkflowInstanceRow::from(&instance))
                .execute(conn)?;
            Ok(instance)
        })
        .await
    }

    async fn get_workflow_instance(&self, id: WorkflowInstanceId) -> StoreResult<WorkflowInstance> {
        use schema::workflow_instances;

        with_conn(&self.pool, move |conn| {
            let row: WorkflowInstanceRow = workflow_instances::table
                .filter(workflow_instances::workflow_instance_id.eq(uuid::Uuid::from(id)))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => {
                        StoreError::NotFound { entity: "workflow_instance", id: id.to_string() }
                    }
                    other => other.into(),
                })?;
            Ok(row.try_into()?)
        })
        .await
    }

    async fn update_workflow_instance(&self, instance: WorkflowInstance) -> StoreResult<WorkflowInstance> {
        use schema::workflow_instances;

        with_conn(&self.pool, move |conn| {
            diesel::update(
                workflow_instances::table
                    .filter(workflow_instances::workflow_instance_id.eq(uuid::Uuid::from(instance.workflow_instance_id))),
            )
            .set(WorkflowInstanceRow::from(&instance))
            .execute(conn)?;
            Ok(instance)
        })
        .await
    }

    async fn create_node_instance(&self, instance: NodeInstance) -> StoreResult<NodeInstance> {
        use schema::node_instances;

        with_conn(&self.pool, move |conn| {
            diesel::insert_into(node_instances::table).values(NodeInstanceRow::from(&instance)).execute(conn)?;
            Ok(instance)
        })
        .await
    }

    async fn get_node_instance(&self, id: NodeInstanceId) -> StoreResult<NodeInstance> {
        use schema::node_instances;

        with_conn(&self.pool, move |conn| {
            let row: NodeInstanceRow = node_instances::table
                .filter(node_instances::node_instance_id.eq(uuid::Uuid::from(id)))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => {
                        StoreError::NotFound { entity: "node_instance", id: id.to_string() }
                    }
                    other => other.into(),
                })?;
            Ok(row.try_into()?)
        })
        .await
    }

    async fn update_node_instance(&self, instance: NodeInstance) -> StoreResult<NodeInstance> {
        use schema::node_instances;

        with_conn(&self.pool, move |conn| {
            diesel::update(
                node_instances::table.filter(node_instances::node_instance_id.eq(uuid::Uuid::from(instance.node_instance_id))),
            )
            .set(NodeInstanceRow::from(&instance))
            .execute(conn)?;
            Ok(instance)
        })
        .await
    }

    async fn list_node_instances(&self, workflow_instance_id: WorkflowInstanceId) -> StoreResult<Vec<NodeInstance>> {
        use schema::node_instances;

        with_conn(&self.pool, move |conn| {
            let rows: Vec<NodeInstanceRow> = node_instances::table
                .filter(node_instances::workflow_instance_id.eq(uuid::Uuid::from(workflow_instance_id)))
                .load(conn)?;
            rows.into_iter().map(TryInto::try_into).collect::<workflow_engine_core::error::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn get_node_instance_by_node(
        &self,
        workflow_instance_id: WorkflowInstanceId,
        node_id: NodeId,
    ) -> StoreResult<NodeInstance> {
        use schema::node_instances;

        with_conn(&self.pool, move |conn| {
            let row: NodeInstanceRow = node_instances::table
                .filter(node_instances::workflow_instance_id.eq(uuid::Uuid::from(workflow_instance_id)))
                .filter(node_instances::node_id.eq(uuid::Uuid::from(node_id)))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => {
                        StoreError::NotFound { entity: "node_instance", id: node_id.to_string() }
                    }
                    other => other.into(),
                })?;
            Ok(row.try_into()?)
        })
        .await
    }
}

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create(&self, task: TaskInstance) -> StoreResult<TaskInstance> {
        use schema::task_instances;

        with_conn(&self.pool, move |conn| {
            diesel::insert_into(task_instances::table).values(TaskInstanceRow::from(&task)).execute(conn)?;
            Ok(task)
        })
        .await
    }

    async fn get(&self, id: TaskInstanceId) -> StoreResult<TaskInstance> {
        use schema::task_instances;

        with_conn(&self.pool, move |conn| {
            let row: TaskInstanceRow = task_instances::table
                .filter(task_instances::task_instance_id.eq(uuid::Uuid::from(id)))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => {
                        StoreError::NotFound { entity: "task_instance", id: id.to_string() }
                    }
                    other => other.into(),
                })?;
            Ok(row.try_into()?)
        })
        .await
    }

    async fn update(&self, task: TaskInstance) -> StoreResult<TaskInstance> {
        use schema::task_instances;

        with_conn(&self.pool, move |conn| {
            diesel::update(task_instances::table.filter(task_instances::task_instance_id.eq(uuid::Uuid::from(task.task_instance_id))))
                .set(TaskInstanceRow::from(&task))
                .execute(conn)?;
            Ok(task)
        })
        .await
    }

    async fn list_for_node(&self, node_instance_id: NodeInstanceId) -> StoreResult<Vec<TaskInstance>> {
        use schema::task_instances;

        with_conn(&self.pool, move |conn| {
            let rows: Vec<TaskInstanceRow> = task_instances::table
                .filter(task_instances::node_instance_id.eq(uuid::Uuid::from(node_instance_id)))
                .load(conn)?;
            rows.into_iter().map(TryInto::try_into).collect::<workflow_engine_core::error::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        status_filter: Option<TaskInstanceStatus>,
        limit: usize,
    ) -> StoreResult<Vec<TaskInstance>> {
        use schema::task_instances;

        with_conn(&self.pool, move |conn| {
            let mut query = task_instances::table
                .filter(task_instances::assigned_user_id.eq(uuid::Uuid::from(user_id)))
                .order(task_instances::created_at.desc())
                .limit(limit as i64)
                .into_boxed();
            if let Some(status) = status_filter {
                query = query.filter(task_instances::status.eq(task_instance_status_to_str(status)));
            }
            let rows: Vec<TaskInstanceRow> = query.load(conn)?;
            rows.into_iter().map(TryInto::try_into).collect::<workflow_engine_core::error::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }
}

pub struct PgSubdivisionRepository {
    pool: PgPool,
}

impl PgSubdivisionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubdivisionRepository for PgSubdivisionRepository {
    async fn create_subdivision(&self, subdivision: Subdivision) -> StoreResult<Subdivision> {
        use schema::subdivisions;

        with_conn(&self.pool, move |conn| {
            diesel::insert_into(subdivisions::table).values(SubdivisionRow::from(&subdivision)).execute(conn)?;
            Ok(subdivision)
        })
        .await
    }

    async fn get_subdivision(&self, id: SubdivisionId) -> StoreResult<Subdivision> {
        use schema::subdivisions;

        with_conn(&self.pool, move |conn| {
            let row: SubdivisionRow = subdivisions::table
                .filter(subdivisions::subdivision_id.eq(uuid::Uuid::from(id)))
                .first(conn)
                .map_err(|e| match e {
                    diesel::result::Error::NotFound => StoreError::NotFound { entity: "subdivision", id: id.to_string() },
                    other => other.into(),
                })?;
            Ok(row.into())
        })
        .await
    }

    async fn update_subdivision(&self, subdivision: Subdivision) -> StoreResult<Subdivision> {
        use schema::subdivisions;

        with_conn(&self.pool, move |conn| {
            diesel::update(subdivisions::table.filter(subdivisions::subdivision_id.eq(uuid::Uuid::from(subdivision.subdivision_id))))
                .set(SubdivisionRow::from(&subdivision))
                .execute(conn)?;
            Ok(subdivision)
        })
        .await
    }

    async fn list_for_task(&self, original_task_id: TaskInstanceId) -> StoreResult<Vec<Subdivision>> {
        use schema::subdivisions;

        with_conn(&self.pool, move |conn| {
            let rows: Vec<SubdivisionRow> = subdivisions::table
                .filter(subdivisions::original_task_id.eq(uuid::Uuid::from(original_task_id)))
                .filter(subdivisions::is_deleted.eq(false))
                .load(conn)?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
        .await
    }

    async fn deselect_siblings(&self, original_task_id: TaskInstanceId, keep: SubdivisionId) -> StoreResult<()> {
        use schema::subdivisions;

        with_conn(&self.pool, move |conn| {
            diesel::update(
                subdivisions::table
                    .filter(subdivisions::original_task_id.eq(uuid::Uuid::from(original_task_id)))
                    .filter(subdivisions::subdivision_id.ne(uuid::Uuid::from(keep))),
            )
            .set(subdivisions::is_selected.eq(false))
            .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn create_adoption(&self, adoption: Adoption) -> StoreResult<Adoption> {
        use schema::adoptions;

        with_conn(&self.pool, move |conn| {
            diesel::insert_into(adoptions::table).values(AdoptionRow::from(&adoption)).execute(conn)?;
            Ok(adoption)
        })
        .await
    }

    async fn list_adoptions_for_workflow(&self, workflow_base_id: WorkflowBaseId) -> StoreResult<Vec<Adoption>> {
        use schema::adoptions;

        with_conn(&self.pool, move |conn| {
            let rows: Vec<AdoptionRow> = adoptions::table
                .filter(adoptions::original_workflow_base_id.eq(uuid::Uuid::from(workflow_base_id)))
                .load(conn)?;
            rows.into_iter().map(TryInto::try_into).collect::<workflow_engine_core::error::Result<Vec<_>>>().map_err(Into::into)
        })
        .await
    }
}

/// Shared pool handle, passed into the four repositories at wiring time.
#[derive(Clone)]
pub struct PgStore {
    pub workflows: Arc<PgWorkflowRepository>,
    pub processors: Arc<PgProcessorRepository>,
    pub instances: Arc<PgInstanceRepository>,
    pub tasks: Arc<PgTaskRepository>,
    pub subdivisions: Arc<PgSubdivisionRepository>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            workflows: Arc::new(PgWorkflowRepository::new(pool.clone())),
            processors: Arc::new(PgProcessorRepository::new(pool.clone())),
            instances: Arc::new(PgInstanceRepository::new(pool.clone())),
            tasks: Arc::new(PgTaskRepository::new(pool.clone())),
            subdivisions: Arc::new(PgSubdivisionRepository::new(pool)),
        }
    }
}
