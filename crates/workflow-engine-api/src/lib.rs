//! HTTP surface for the workflow execution core (§6): instance
//! lifecycle, human task, and subdivision routes, wired onto
//! [`state::AppState`] and served behind whatever gateway authenticates
//! the caller and forwards `X-User-Id`.

pub mod current_user;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use current_user::CurrentUser;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
