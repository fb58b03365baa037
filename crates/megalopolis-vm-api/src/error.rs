use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use megalopolis_common::{ErrorBody, ExecError, PrettyJson};

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("VM '{0}' not found")]
    NotFound(String),

    #[error("{}", failure_detail(.code, .stderr))]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

fn failure_detail(code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl VmError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VmError::NotFound(_) => StatusCode::NOT_FOUND,
            VmError::Exec(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            VmError::CommandFailed { .. } | VmError::Exec(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for VmError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error=%self, "vm request failed");
        }
        (status, PrettyJson(ErrorBody::new(self.to_string()))).into_response()
    }
}
