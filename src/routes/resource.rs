//! Resource routes mounted under the configured prefix:
//! `/{prefix}/:alias`, `/{prefix}/:alias/meta`, `/{prefix}/:alias/meta/:field`.

use crate::handlers::resource::{destroy, field_meta, index, meta, patch_field, store, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Middleware name that applies a request body limit of `max_body_bytes`.
pub const BODY_LIMIT: &str = "body-limit";

pub fn resource_routes(state: AppState) -> Router {
    let settings = state.settings.clone();
    let mut routes = Router::new()
        .route("/:alias", get(index).post(store).patch(update).delete(destroy))
        .route("/:alias/meta", get(meta))
        .route("/:alias/meta/:field", get(field_meta).patch(patch_field))
        .with_state(state);

    for name in &settings.route_middleware {
        match name.as_str() {
            BODY_LIMIT => {
                routes = routes.layer(RequestBodyLimitLayer::new(settings.max_body_bytes));
            }
            other => tracing::warn!(middleware = %other, "unknown route middleware ignored"),
        }
    }

    if settings.route_prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&format!("/{}", settings.route_prefix), routes)
    }
}
