//! Shared application state (§6): one instance wired up once in the
//! app crate's bootstrap and handed to every handler as `web::Data`.

use std::sync::Arc;

use workflow_engine_runtime::ExecutionEngine;
use workflow_engine_store::InstanceRepository;
use workflow_engine_subdivision::SubdivisionService;
use workflow_engine_tasks::HumanTaskService;

pub struct AppState {
    pub engine: Arc<ExecutionEngine>,
    pub instances: Arc<dyn InstanceRepository>,
    pub human_tasks: Arc<HumanTaskService>,
    pub subdivisions: Arc<SubdivisionService>,
}
