//! Instance lifecycle API (§6): execute, cancel, get-detail.

use actix_web::{web, HttpResponse};
use serde_json::json;

use workflow_engine_core::ids::WorkflowInstanceId;
use workflow_engine_core::model::instance::NodeInstanceStatus;

use crate::current_user::CurrentUser;
use crate::dto::{
    CancelInstanceResponse, ExecuteWorkflowRequest, ExecuteWorkflowResponse, InstanceDetailResponse, NodeStatusCounts,
    PauseOrRejectOrCancelRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn execute_workflow(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<ExecuteWorkflowRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let input_data = match body.context_data {
        Some(context_data) => json!({ "input": body.input_data, "context": context_data }),
        None => body.input_data,
    };

    let workflow_instance_id = state
        .engine
        .start_instance(body.workflow_base_id, input_data, user.0, user.0, body.instance_name)
        .await?;

    Ok(HttpResponse::Ok().json(ExecuteWorkflowResponse { workflow_instance_id }))
}

pub async fn cancel_instance(
    state: web::Data<AppState>,
    _user: CurrentUser,
    path: web::Path<WorkflowInstanceId>,
    body: Option<web::Json<PauseOrRejectOrCancelRequest>>,
) -> ApiResult<HttpResponse> {
    let workflow_instance_id = path.into_inner();
    let reason = body.map(|b| b.into_inner().reason).unwrap_or_else(|| "cancelled via API".to_string());

    let cancelled_tasks_count = state.engine.cancel_instance(workflow_instance_id, reason).await?;
    let instance = state.instances.get_workflow_instance(workflow_instance_id).await?;

    Ok(HttpResponse::Ok().json(CancelInstanceResponse { cancelled_tasks_count, status: instance.status }))
}

pub async fn get_instance(state: web::Data<AppState>, path: web::Path<WorkflowInstanceId>) -> ApiResult<HttpResponse> {
    let workflow_instance_id = path.into_inner();
    let instance = state.instances.get_workflow_instance(workflow_instance_id).await?;
    let node_instances = state.instances.list_node_instances(workflow_instance_id).await?;

    let mut node_counts = NodeStatusCounts { pending: 0, waiting: 0, running: 0, completed: 0, failed: 0, cancelled: 0 };
    for node_instance in &node_instances {
        match node_instance.status {
            NodeInstanceStatus::Pending => node_counts.pending += 1,
            NodeInstanceStatus::Waiting => node_counts.waiting += 1,
            NodeInstanceStatus::Running => node_counts.running += 1,
            NodeInstanceStatus::Completed => node_counts.completed += 1,
            NodeInstanceStatus::Failed => node_counts.failed += 1,
            NodeInstanceStatus::Cancelled => node_counts.cancelled += 1,
        }
    }

    Ok(HttpResponse::Ok().json(InstanceDetailResponse { instance, node_counts }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/workflows/execute").route(web::post().to(execute_workflow)))
        .service(web::resource("/workflows/instances/{id}/cancel").route(web::post().to(cancel_instance)))
        .service(web::resource("/workflows/instances/{id}").route(web::get().to(get_instance)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;

    use workflow_engine_core::model::definition::{Processor, ProcessorBinding};
    use workflow_engine_core::model::instance::TaskInstance;
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

    async fn build_state() -> (web::Data<AppState>, workflow_engine_core::ids::WorkflowBaseId, workflow_engine_core::ids::UserId) {
        let instances = Arc::new(InMemoryInstanceRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        let subdivisions_repo = Arc::new(InMemorySubdivisionRepository::default());
        let workflows = Arc::new(InMemoryWorkflowRepository::new(instances.clone(), tasks.clone(), subdivisions_repo.clone()));
        let processors = Arc::new(InMemoryProcessorRepository::default());

        let user_id = workflow_engine_core::ids::UserId::new();
        let (workflow, nodes, edges) = straight_line_workflow("S1", user_id);
        let workflow_base_id = workflow.workflow_base_id;
        workflows
            .create_initial(WorkflowVersionGraph { workflow, nodes, edges, bindings: Vec::<ProcessorBinding>::new() })
            .await
            .unwrap();

        let context = Arc::new(WorkflowContextManager::new(instances.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            workflows.clone(),
            processors,
            instances.clone(),
            tasks.clone(),
            context.clone(),
            Arc::new(NoopDispatcher),
        ));
        let human_tasks = Arc::new(HumanTaskService::new(tasks.clone(), instances.clone(), context, engine.clone()));
        let subdivisions = Arc::new(SubdivisionService::new(tasks, workflows, subdivisions_repo, engine.clone()));

        let state = web::Data::new(AppState { engine, instances, human_tasks, subdivisions });
        (state, workflow_base_id, user_id)
    }

    #[actix_web::test]
    async fn executing_an_unbound_workflow_completes_immediately() {
        let (state, workflow_base_id, user_id) = build_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/workflows/execute")
            .insert_header(("X-User-Id", user_id.to_string()))
            .set_json(serde_json::json!({ "workflow_base_id": workflow_base_id, "input_data": {"x": 1} }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: ExecuteWorkflowResponse = test::read_body_json(resp).await;

        let req = test::TestRequest::get().uri(&format!("/workflows/instances/{}", body.workflow_instance_id)).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let detail: Value = test::read_body_json(resp).await;
        assert_eq!(detail["instance"]["status"], "completed");
    }

    #[actix_web::test]
    async fn executing_without_a_user_header_is_unauthorised() {
        let (state, workflow_base_id, _user_id) = build_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/workflows/execute")
            .set_json(serde_json::json!({ "workflow_base_id": workflow_base_id, "input_data": {} }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
    }
}
