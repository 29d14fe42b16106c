mod config;

use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenvy::dotenv;
use tracing::{error, info};

use workflow_engine_core::config::AgentModelConfig;
use workflow_engine_core::error::retry::RetryPolicy;
use workflow_engine_core::model::definition::Processor;
use workflow_engine_core::model::instance::TaskInstance;
use workflow_engine_runtime::{ExecutionEngine, TaskDispatcher, WorkflowContextManager};
use workflow_engine_store::postgres::{build_pool, PgStore};
use workflow_engine_subdivision::SubdivisionService;
use workflow_engine_tasks::{AgentTaskService, HumanTaskService, ReqwestAgentClient};

use config::AppConfig;

/// Wires `ExecutionEngine` and `AgentTaskService` around their mutual
/// dependency: the engine needs a dispatcher at construction time, and
/// the dispatcher (the agent service) needs the already-constructed
/// engine. The relay is set exactly once, before the server starts
/// accepting requests.
struct DispatcherRelay {
    inner: Mutex<Option<Arc<AgentTaskService>>>,
}

impl DispatcherRelay {
    fn new() -> Self {
        Self { inner: Mutex::new(None) }
    }

    fn set(&self, service: Arc<AgentTaskService>) {
        *self.inner.lock().expect("dispatcher relay mutex poisoned") = Some(service);
    }
}

#[async_trait::async_trait]
impl TaskDispatcher for DispatcherRelay {
    async fn dispatch(&self, task: TaskInstance, processor: Processor) {
        let service = self.inner.lock().expect("dispatcher relay mutex poisoned").clone();
        match service {
            Some(service) => service.dispatch(task, processor).await,
            None => error!("dispatcher relay invoked before the agent service was wired"),
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env().map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    let pool = build_pool(&config.database_url, config.max_db_connections)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    let store = PgStore::new(pool);

    let context = Arc::new(WorkflowContextManager::new(store.instances.clone()));
    let relay = Arc::new(DispatcherRelay::new());
    let engine = Arc::new(ExecutionEngine::new(
        store.workflows.clone(),
        store.processors.clone(),
        store.instances.clone(),
        store.tasks.clone(),
        context.clone(),
        relay.clone(),
    ));

    let agent_model_config = AgentModelConfig::from_env()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let agent_client = Arc::new(ReqwestAgentClient::new(Arc::new(reqwest::Client::new()), agent_model_config));

    let agent_tasks =
        Arc::new(AgentTaskService::new(store.tasks.clone(), store.instances.clone(), engine.clone(), agent_client, RetryPolicy::default()));
    relay.set(agent_tasks);

    let human_tasks = Arc::new(HumanTaskService::new(store.tasks.clone(), store.instances.clone(), context, engine.clone()));
    let subdivisions =
        Arc::new(SubdivisionService::new(store.tasks.clone(), store.workflows.clone(), store.subdivisions.clone(), engine.clone()));

    let state = web::Data::new(workflow_engine_api::AppState {
        engine,
        instances: store.instances.clone(),
        human_tasks,
        subdivisions,
    });

    let bind_address = config.bind_address();
    info!(%bind_address, "starting workflow engine");

    HttpServer::new(move || {
        let cors = Cors::default().allow_any_origin().allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(workflow_engine_api::routes::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}
