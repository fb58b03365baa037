pub mod args;
pub mod error;
pub mod handlers;
pub mod state;

use axum::{middleware, routing::get, Router};
use tower_http::services::ServeDir;

use megalopolis_common::access_log::access_log;

use crate::handlers::{index, status_api};
use crate::state::AppState;

/// `/`, `/index.html` and `/api/status`; everything else is served from the dashboard dir.
pub fn build_router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.config.dashboard_dir);

    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .route("/api/status", get(status_api))
        .fallback_service(assets)
        .layer(middleware::from_fn(access_log))
        .with_state(state)
}
