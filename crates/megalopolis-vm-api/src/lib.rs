pub mod args;
pub mod backend;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod state;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use megalopolis_common::access_log::access_log;

use crate::handlers::{
    get_vm, health, list_vms, method_not_allowed, not_found, start_vm, stop_vm,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Method fallbacks turn axum's bare 405 into a JSON error body.
    Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/vms", get(list_vms).fallback(method_not_allowed))
        .route("/vms/:name", get(get_vm).fallback(method_not_allowed))
        .route(
            "/vms/:name/start",
            post(start_vm).fallback(method_not_allowed),
        )
        .route("/vms/:name/stop", post(stop_vm).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(cors)
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}
