use axum::{
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tokio::process::Command;

use megalopolis_common::{run_with_timeout, PrettyJson};

use crate::error::DashboardError;
use crate::state::{AppState, DashboardConfig};

const NO_CACHE: [(HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Run the status script and parse its stdout as JSON.
pub async fn fetch_status(config: &DashboardConfig) -> Result<Value, DashboardError> {
    let mut cmd = Command::new(&config.status_script);
    cmd.current_dir(&config.project_root);

    let out = run_with_timeout(cmd, config.status_timeout).await?;
    if !out.success() {
        return Err(DashboardError::ScriptFailed {
            code: out.code,
            stdout: out.stdout,
            stderr: out.stderr,
        });
    }
    serde_json::from_str(&out.stdout).map_err(DashboardError::InvalidJson)
}

pub async fn status_api(State(st): State<AppState>) -> Result<Response, DashboardError> {
    let payload = fetch_status(&st.config).await?;
    Ok((
        NO_CACHE,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        PrettyJson(payload),
    )
        .into_response())
}

pub async fn index(State(st): State<AppState>) -> Result<Response, DashboardError> {
    let path = st.config.dashboard_dir.join("index.html");
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(DashboardError::Index)?;
    Ok((
        NO_CACHE,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        content,
    )
        .into_response())
}
