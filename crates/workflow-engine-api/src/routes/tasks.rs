//! Human task API (§6): list-my-tasks, get-detail, and the
//! start/submit/pause/reject/cancel lifecycle.

use actix_web::{web, HttpResponse};

use workflow_engine_core::ids::TaskInstanceId;

use crate::current_user::CurrentUser;
use crate::dto::{
    ListTasksQuery, PauseOrRejectOrCancelRequest, SubmitTaskRequest, TaskDetailResponse, TaskListResponse, TaskResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_my_tasks(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<ListTasksQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let tasks = state.human_tasks.list_user_tasks(user.0, query.status, query.limit).await?;
    Ok(HttpResponse::Ok().json(TaskListResponse { tasks }))
}

pub async fn get_task(state: web::Data<AppState>, user: CurrentUser, path: web::Path<TaskInstanceId>) -> ApiResult<HttpResponse> {
    let details = state.human_tasks.get_task_details(path.into_inner(), user.0).await?;
    Ok(HttpResponse::Ok().json(TaskDetailResponse(details)))
}

pub async fn start_task(state: web::Data<AppState>, user: CurrentUser, path: web::Path<TaskInstanceId>) -> ApiResult<HttpResponse> {
    let task = state.human_tasks.start(path.into_inner(), user.0).await?;
    Ok(HttpResponse::Ok().json(TaskResponse(task)))
}

pub async fn submit_task(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<TaskInstanceId>,
    body: web::Json<SubmitTaskRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let task = state.human_tasks.submit(path.into_inner(), user.0, body.result_data, body.result_summary).await?;
    Ok(HttpResponse::Ok().json(TaskResponse(task)))
}

pub async fn pause_task(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<TaskInstanceId>,
    body: web::Json<PauseOrRejectOrCancelRequest>,
) -> ApiResult<HttpResponse> {
    let task = state.human_tasks.pause(path.into_inner(), user.0, body.into_inner().reason).await?;
    Ok(HttpResponse::Ok().json(TaskResponse(task)))
}

pub async fn reject_task(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<TaskInstanceId>,
    body: web::Json<PauseOrRejectOrCancelRequest>,
) -> ApiResult<HttpResponse> {
    let task = state.human_tasks.reject(path.into_inner(), user.0, body.into_inner().reason).await?;
    Ok(HttpResponse::Ok().json(TaskResponse(task)))
}

pub async fn cancel_task(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<TaskInstanceId>,
    body: web::Json<PauseOrRejectOrCancelRequest>,
) -> ApiResult<HttpResponse> {
    let task = state.human_tasks.cancel(path.into_inner(), user.0, body.into_inner().reason).await?;
    Ok(HttpResponse::Ok().json(TaskResponse(task)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/tasks/my").route(web::get().to(list_my_tasks)))
        .service(web::resource("/tasks/{id}").route(web::get().to(get_task)))
        .service(web::resource("/tasks/{id}/start").route(web::post().to(start_task)))
        .service(web::resource("/tasks/{id}/submit").route(web::post().to(submit_task)))
        .service(web::resource("/tasks/{id}/pause").route(web::post().to(pause_task)))
        .service(web::resource("/tasks/{id}/reject").route(web::post().to(reject_task)))
        .service(web::resource("/tasks/{id}/cancel").route(web::post().to(cancel_task)));
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

    async fn build_state() -> (web::Data<AppState>, workflow_engine_core::ids::UserId, workflow_engine_core::ids::TaskInstanceId) {
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

    #[actix_web::test]
    async fn start_then_submit_via_http_completes_the_task() {
        let (state, user_id, task_id) = build_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/tasks/{task_id}/start"))
            .insert_header(("X-User-Id", user_id.to_string()))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri(&format!("/tasks/{task_id}/submit"))
            .insert_header(("X-User-Id", user_id.to_string()))
            .set_json(json!({ "result_data": {"ok": true}, "result_summary": "done" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "completed");
    }

    #[actix_web::test]
    async fn a_different_user_cannot_start_the_task() {
        let (state, _user_id, task_id) = build_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/tasks/{task_id}/start"))
            .insert_header(("X-User-Id", workflow_engine_core::ids::UserId::new().to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
    }
}
