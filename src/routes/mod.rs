//! Router builders.

mod common;
mod resource;

pub use common::{common_routes, common_routes_with_ready};
pub use resource::{resource_routes, BODY_LIMIT};

use crate::state::AppState;
use axum::Router;

/// Resource routes under the configured prefix plus health/ready/version at the root.
pub fn app_router(state: AppState) -> Router {
    resource_routes(state.clone()).merge(common_routes_with_ready(state))
}
