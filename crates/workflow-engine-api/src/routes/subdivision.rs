//! Task-subdivision API (§6/§4.8): subdivide, list, select, adopt.

use actix_web::{web, HttpResponse};

use workflow_engine_core::ids::{TaskInstanceId, WorkflowBaseId};

use crate::current_user::CurrentUser;
use crate::dto::{AdoptSubdivisionRequest, ListSubdivisionsQuery, SubdivideTaskRequest};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(serde::Serialize)]
struct SubdivisionListResponse {
    subdivisions: Vec<workflow_engine_core::model::subdivision::Subdivision>,
}

pub async fn subdivide_task(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<TaskInstanceId>,
    body: web::Json<SubdivideTaskRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let subdivision = state
        .subdivisions
        .create_subdivision(
            path.into_inner(),
            user.0,
            &body.sub_workflow_data,
            body.context_to_pass,
            body.parent_subdivision_id,
            body.execute_immediately,
        )
        .await?;
    Ok(HttpResponse::Ok().json(subdivision))
}

pub async fn list_subdivisions(
    state: web::Data<AppState>,
    path: web::Path<TaskInstanceId>,
    query: web::Query<ListSubdivisionsQuery>,
) -> ApiResult<HttpResponse> {
    let subdivisions = state.subdivisions.list_for_task(path.into_inner(), query.into_inner().with_instances_only).await?;
    Ok(HttpResponse::Ok().json(SubdivisionListResponse { subdivisions }))
}

pub async fn select_subdivision(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<workflow_engine_core::ids::SubdivisionId>,
) -> ApiResult<HttpResponse> {
    let subdivision = state.subdivisions.select_subdivision(path.into_inner(), user.0).await?;
    Ok(HttpResponse::Ok().json(subdivision))
}

pub async fn adopt_subdivision(
    state: web::Data<AppState>,
    path: web::Path<WorkflowBaseId>,
    body: web::Json<AdoptSubdivisionRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let adoption = state
        .subdivisions
        .adopt_subdivision(body.subdivision_id, path.into_inner(), body.target_node_id, body.adoption_name)
        .await?;
    Ok(HttpResponse::Ok().json(adoption))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/task-subdivision/tasks/{task_id}/subdivide").route(web::post().to(subdivide_task)))
        .service(web::resource("/task-subdivision/tasks/{task_id}/subdivisions").route(web::get().to(list_subdivisions)))
        .service(web::resource("/task-subdivision/workflows/{workflow_base_id}/adopt").route(web::post().to(adopt_subdivision)))
        .service(web::resource("/task-subdivision/subdivisions/{id}/select").route(web::post().to(select_subdivision)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    use workflow_engine_core::model::definition::{NodeType, Processor, ProcessorBinding};
    use workflow_engine_core::model::instance::{NodeInstanceStatus, TaskInstance};
    use workflow_engine_core::testing::fixtures::straight_line_workflow;
    use workflow_engine_runtime::{ExecutionEngine, TaskDispatcher, WorkflowContextManager};
    use workflow_engine_store::memory::{
        InMemoryInstanceRepository, InMemoryProcessorRepository, InMemorySubdivisionRepository, InMemoryTaskRepository,
        InMemoryWorkflowRepository,
    };
    use workflow_engine_store::WorkflowVersionGraph;
    use workflow_engine_subdivision::SubdivisionService;
    use workflow_engine_tasks::HumanTaskService;

    struct NoopDispatcher;
    #[async_trait::async_trait]
    impl TaskDispatcher for NoopDispatcher {
        async fn dispatch(&self, _task: TaskInstance, _processor: Processor) {}
    }

    async fn build_state() -> (web::Data<AppState>, workflow_engine_core::ids::UserId, TaskInstanceId) {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions_repo = Arc::new(InMemorySubdivisionRepository::default());
        let workflows = Arc::new(InMemoryWorkflowRepository::new(instances.clone(), tasks.clone(), subdivisions_repo.clone()));
        let processors = Arc::new(InMemoryProcessorRepository::default());

        let user_id = workflow_engine_core::ids::UserId::new();
        let (workflow, nodes, edges) = straight_line_workflow("S1", user_id);
        let workflow_base_id = workflow.workflow_base_id;
        let processor_node = nodes.iter().find(|n| n.node_type == NodeType::Processor).unwrap();
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
            context.clone(),
            Arc::new(NoopDispatcher),
        ));

        let workflow_instance_id = engine.start_instance(workflow_base_id, Value::Null, user_id, user_id, None).await.unwrap();
        let node_instances = instances.list_node_instances(workflow_instance_id).await.unwrap();
        let processor_node_instance = node_instances.iter().find(|n| n.status == NodeInstanceStatus::Running).unwrap();
        let pending_tasks = tasks.list_for_node(processor_node_instance.node_instance_id).await.unwrap();
        let task_id = pending_tasks[0].task_instance_id;

        let human_tasks = Arc::new(HumanTaskService::new(tasks.clone(), instances.clone(), context, engine.clone()));
        let subdivisions = Arc::new(SubdivisionService::new(tasks, workflows, subdivisions_repo, engine.clone()));

        let state = web::Data::new(AppState { engine, instances, human_tasks, subdivisions });
        (state, user_id, task_id)
    }

    fn sub_definition_body() -> Value {
        json!({
            "subdivision_name": "breakdown",
            "sub_workflow_data": {
                "name": "Sub",
                "description": null,
                "nodes": [
                    {"temp_id": 1, "name": "S", "node_type": "start", "task_description": null},
                    {"temp_id": 2, "name": "P", "node_type": "processor", "task_description": null},
                    {"temp_id": 3, "name": "E", "node_type": "end", "task_description": null}
                ],
                "edges": [
                    {"from_temp_id": 1, "to_temp_id": 2, "edge_type": "normal"},
                    {"from_temp_id": 2, "to_temp_id": 3, "edge_type": "normal"}
                ]
            },
            "execute_immediately": false
        })
    }

    #[actix_web::test]
    async fn subdividing_then_listing_returns_the_new_subdivision() {
        let (state, user_id, task_id) = build_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/task-subdivision/tasks/{task_id}/subdivide"))
            .insert_header(("X-User-Id", user_id.to_string()))
            .set_json(sub_definition_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get()
            .uri(&format!("/task-subdivision/tasks/{task_id}/subdivisions"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["subdivisions"].as_array().unwrap().len(), 1);
    }
}
