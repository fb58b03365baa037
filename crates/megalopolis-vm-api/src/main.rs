use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use megalopolis_common::shutdown::shutdown_signal;
use megalopolis_common::telemetry::{init_tracing, shutdown_tracing};
use megalopolis_vm_api::args::Args;
use megalopolis_vm_api::backend::CliVmBackend;
use megalopolis_vm_api::build_router;
use megalopolis_vm_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let provider = init_tracing(
        "megalopolis-vm-api",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    let backend = CliVmBackend::new(args.cli_config());
    tracing::info!(
        vm_bin=%backend.config().bin,
        run_flags=?backend.config().run_flags,
        "vm api starting"
    );

    let app = build_router(AppState::new(Arc::new(backend)));

    let listener = tokio::net::TcpListener::bind(&args.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.listen_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "health endpoint: http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    shutdown_tracing(provider);
    Ok(())
}
