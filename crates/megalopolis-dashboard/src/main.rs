use std::io::ErrorKind;

use anyhow::Context;
use clap::Parser;

use megalopolis_common::shutdown::shutdown_signal;
use megalopolis_common::telemetry::{init_tracing, shutdown_tracing};
use megalopolis_dashboard::args::Args;
use megalopolis_dashboard::build_router;
use megalopolis_dashboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let provider = init_tracing(
        "megalopolis-dashboard",
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    let config = args.dashboard_config().resolve()?;
    tracing::info!(
        dashboard_dir=%config.dashboard_dir.display(),
        status_script=%config.status_script.display(),
        project_root=%config.project_root.display(),
        "dashboard starting"
    );

    let listener = match tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            anyhow::bail!(
                "port {} is already in use, try a different port: megalopolis-dashboard {}",
                args.port,
                args.port.saturating_add(1)
            );
        }
        Err(e) => return Err(e).context("failed to start server"),
    };

    tracing::info!("dashboard running on http://localhost:{}", args.port);
    tracing::info!("API endpoint: http://localhost:{}/api/status", args.port);

    let app = build_router(AppState::new(config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    shutdown_tracing(provider);
    Ok(())
}
