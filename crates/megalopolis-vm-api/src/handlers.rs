use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use megalopolis_common::{utc_timestamp, ErrorBody, PrettyJson};

use crate::error::VmError;
use crate::listing::VmRecord;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

/// Body of start/stop responses, successful or not.
#[derive(Debug, Serialize)]
pub struct OperationAck {
    pub status: &'static str,
    pub message: String,
    pub vm_name: String,
    pub timestamp: String,
}

fn ack(code: StatusCode, status: &'static str, message: String, vm_name: String) -> Response {
    let body = OperationAck {
        status,
        message,
        vm_name,
        timestamp: utc_timestamp(),
    };
    (code, PrettyJson(body)).into_response()
}

fn failed_ack(verb: &str, vm_name: String, err: VmError) -> Response {
    let code = err.status_code();
    let message = match &err {
        VmError::NotFound(_) => err.to_string(),
        _ => format!("Failed to {verb} VM '{vm_name}': {err}"),
    };
    if code.is_server_error() {
        tracing::error!(vm=%vm_name, %verb, error=%err, "vm operation failed");
    }
    ack(code, "error", message, vm_name)
}

async fn require_vm(st: &AppState, name: &str) -> Result<VmRecord, VmError> {
    st.backend
        .find(name)
        .await?
        .ok_or_else(|| VmError::NotFound(name.to_string()))
}

async fn start_existing(st: &AppState, name: &str) -> Result<(), VmError> {
    require_vm(st, name).await?;
    st.backend.start(name).await
}

async fn stop_existing(st: &AppState, name: &str) -> Result<(), VmError> {
    require_vm(st, name).await?;
    st.backend.stop(name).await
}

pub async fn health() -> impl IntoResponse {
    PrettyJson(HealthResponse {
        status: "healthy",
        message: "VM API is running",
        timestamp: utc_timestamp(),
    })
}

pub async fn list_vms(State(st): State<AppState>) -> Result<PrettyJson<Vec<VmRecord>>, VmError> {
    let vms = st.backend.list().await?;
    Ok(PrettyJson(vms))
}

pub async fn get_vm(
    State(st): State<AppState>,
    Path(name): Path<String>,
) -> Result<PrettyJson<VmRecord>, VmError> {
    require_vm(&st, &name).await.map(PrettyJson)
}

pub async fn start_vm(State(st): State<AppState>, Path(name): Path<String>) -> Response {
    match start_existing(&st, &name).await {
        Ok(()) => {
            tracing::info!(vm=%name, "vm start requested");
            let message = format!("VM '{name}' is starting");
            ack(StatusCode::ACCEPTED, "starting", message, name)
        }
        Err(e) => failed_ack("start", name, e),
    }
}

pub async fn stop_vm(State(st): State<AppState>, Path(name): Path<String>) -> Response {
    match stop_existing(&st, &name).await {
        Ok(()) => {
            let message = format!("VM '{name}' stopped");
            ack(StatusCode::OK, "success", message, name)
        }
        Err(e) => failed_ack("stop", name, e),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, PrettyJson(ErrorBody::new("Endpoint not found")))
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        PrettyJson(ErrorBody::new("Method not allowed")),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use megalopolis_common::ExecError;

    use super::*;
    use crate::backend::VmBackend;
    use crate::build_router;
    use crate::listing::{parse_listing, DEFAULT_HEADER_TOKEN};

    const LISTING: &str = "\
Source Name       Disk Size State
local  alpha      50   20   running
junk   row
oci    beta       30   10   stopped
";

    #[derive(Default)]
    enum StopBehavior {
        #[default]
        Succeed,
        Fail(&'static str),
        Hang,
    }

    #[derive(Default)]
    enum StartBehavior {
        #[default]
        Succeed,
        SpawnFails,
    }

    #[derive(Default)]
    struct FakeBackend {
        listing: &'static str,
        list_hangs: bool,
        start_behavior: StartBehavior,
        stop_behavior: StopBehavior,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    fn timeout_err() -> VmError {
        VmError::Exec(ExecError::Timeout {
            program: "tart".into(),
            timeout: Duration::from_secs(10),
        })
    }

    #[async_trait]
    impl VmBackend for FakeBackend {
        async fn list(&self) -> Result<Vec<VmRecord>, VmError> {
            if self.list_hangs {
                return Err(timeout_err());
            }
            Ok(parse_listing(self.listing, DEFAULT_HEADER_TOKEN))
        }

        async fn start(&self, _name: &str) -> Result<(), VmError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            match self.start_behavior {
                StartBehavior::Succeed => Ok(()),
                StartBehavior::SpawnFails => Err(VmError::Exec(ExecError::Spawn {
                    program: "tart".into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })),
            }
        }

        async fn stop(&self, _name: &str) -> Result<(), VmError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            match self.stop_behavior {
                StopBehavior::Succeed => Ok(()),
                StopBehavior::Fail(stderr) => Err(VmError::CommandFailed {
                    code: Some(1),
                    stderr: stderr.to_string(),
                }),
                StopBehavior::Hang => Err(timeout_err()),
            }
        }
    }

    fn fake(listing: &'static str) -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            listing,
            ..Default::default()
        })
    }

    async fn call(backend: Arc<FakeBackend>, method: Method, uri: &str) -> (StatusCode, Value) {
        let app = build_router(AppState::new(backend));
        let resp = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(fake(""), Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["message"].is_string());
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_list_vms() {
        let (status, body) = call(fake(LISTING), Method::GET, "/vms").await;
        assert_eq!(status, StatusCode::OK);
        let vms = body.as_array().unwrap();
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0]["name"], "alpha");
        assert_eq!(vms[0]["source"], "local");
        assert_eq!(vms[0]["status"], "running");
        assert_eq!(vms[1]["name"], "beta");
    }

    #[tokio::test]
    async fn test_list_vms_empty_is_ok() {
        let (status, body) = call(fake(""), Method::GET, "/vms").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_list_vms_timeout_is_504() {
        let backend = Arc::new(FakeBackend {
            list_hangs: true,
            ..Default::default()
        });
        let (status, body) = call(backend, Method::GET, "/vms").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["error"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_get_vm() {
        let (status, body) = call(fake(LISTING), Method::GET, "/vms/beta").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "beta");
        assert_eq!(body["status"], "stopped");
        assert_eq!(body["source"], "oci");
    }

    #[tokio::test]
    async fn test_get_vm_not_found() {
        let (status, body) = call(fake(LISTING), Method::GET, "/vms/gamma").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "VM 'gamma' not found");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_start_missing_vm_does_not_run() {
        let backend = fake(LISTING);
        let (status, body) =
            call(backend.clone(), Method::POST, "/vms/missing-vm/start").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert_eq!(body["vm_name"], "missing-vm");
        assert_eq!(backend.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_vm_accepted() {
        let backend = fake(LISTING);
        let (status, body) = call(backend.clone(), Method::POST, "/vms/alpha/start").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "starting");
        assert_eq!(body["vm_name"], "alpha");
        assert!(body["message"].is_string());
        assert!(body["timestamp"].is_string());
        assert_eq!(backend.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_vm_spawn_failure_is_500() {
        let backend = Arc::new(FakeBackend {
            listing: LISTING,
            start_behavior: StartBehavior::SpawnFails,
            ..Default::default()
        });
        let (status, body) = call(backend.clone(), Method::POST, "/vms/alpha/start").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["vm_name"], "alpha");
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to start VM 'alpha'"), "{message}");
        assert!(message.contains("failed to spawn `tart`"), "{message}");
        assert!(body["timestamp"].is_string());
        assert_eq!(backend.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_vm_success() {
        let backend = fake(LISTING);
        let (status, body) = call(backend.clone(), Method::POST, "/vms/alpha/stop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["vm_name"], "alpha");
        assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_vm_failure_carries_stderr() {
        let backend = Arc::new(FakeBackend {
            listing: LISTING,
            stop_behavior: StopBehavior::Fail("busy"),
            ..Default::default()
        });
        let (status, body) = call(backend, Method::POST, "/vms/alpha/stop").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("busy"));
    }

    #[tokio::test]
    async fn test_stop_vm_timeout_is_504() {
        let backend = Arc::new(FakeBackend {
            listing: LISTING,
            stop_behavior: StopBehavior::Hang,
            ..Default::default()
        });
        let (status, body) = call(backend, Method::POST, "/vms/alpha/stop").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_stop_missing_vm() {
        let backend = fake(LISTING);
        let (status, _) = call(backend.clone(), Method::POST, "/vms/nope/stop").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(backend.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) = call(fake(""), Method::GET, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_wrong_method_is_json_405() {
        for (method, uri) in [(Method::GET, "/vms/alpha/start"), (Method::POST, "/health")] {
            let backend = fake(LISTING);
            let (status, body) = call(backend.clone(), method, uri).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
            assert_eq!(body["error"], "Method not allowed");
            assert!(body["timestamp"].is_string());
            assert_eq!(backend.starts.load(Ordering::SeqCst), 0);
        }
    }
}
