//! Caller identity extraction. Authentication itself is out of scope
//! (§1 Non-goals); callers are expected to sit behind a gateway that
//! authenticates the request and forwards the resolved user id.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use workflow_engine_core::ids::UserId;

use crate::error::ApiError;

pub struct CurrentUser(pub UserId);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = req
            .headers()
            .get("X-User-Id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<uuid::Uuid>().ok())
            .map(|uuid| CurrentUser(UserId::from_uuid(uuid)))
            .ok_or_else(|| ApiError(workflow_engine_core::error::WorkflowError::not_authorised("missing or invalid X-User-Id header")));
        ready(result)
    }
}
