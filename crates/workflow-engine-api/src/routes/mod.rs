//! Route wiring (§6). `/api/v1` carries the instance, task, and
//! subdivision surfaces; `/health` sits outside it, unauthenticated.

pub mod health;
pub mod instances;
pub mod subdivision;
pub mod tasks;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/v1").configure(instances::configure).configure(tasks::configure).configure(subdivision::configure));
    health::configure(cfg);
}
