pub mod achievements;
pub mod content;
pub mod health;
pub mod internal;
pub mod preferences;
pub mod progress;
pub mod realtime;
pub mod subscription;

use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::middleware::{rate_limit, request_id};
use crate::state::AppState;

/// Maximum request body size: 4 MiB (catalog replacement is the largest payload).
const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/progress", progress::router())
        .nest("/achievements", achievements::router())
        .nest("/preferences", preferences::router())
        .nest("/content", content::router())
        .nest("/subscription", subscription::router())
        .nest("/internal", internal::router())
        .nest("/realtime", realtime::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}
