use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use megalopolis_common::{ErrorBody, ExecError, PrettyJson};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(
        "Status script failed (code {}): stdout={}, stderr={}",
        exit_code(.code),
        .stdout,
        .stderr
    )]
    ScriptFailed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Invalid JSON from status script: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Status check timed out")]
    Timeout,

    #[error("Unexpected error: {0}")]
    Exec(#[source] ExecError),

    #[error("Failed to serve dashboard: {0}")]
    Index(#[source] std::io::Error),
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

impl From<ExecError> for DashboardError {
    fn from(e: ExecError) -> Self {
        if e.is_timeout() {
            DashboardError::Timeout
        } else {
            DashboardError::Exec(e)
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        tracing::error!(error=%self, "dashboard request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            PrettyJson(ErrorBody::new(self.to_string())),
        )
            .into_response()
    }
}
