use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::state::DashboardConfig;

#[derive(Debug, Parser)]
#[command(name = "megalopolis-dashboard", author, version, about = "Megalopolis status dashboard server")]
pub struct Args {
    /// Port to listen on.
    #[arg(env = "MEGALOPOLIS_DASHBOARD_PORT", default_value_t = 8090)]
    pub port: u16,

    #[arg(long, env = "MEGALOPOLIS_DASHBOARD_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Directory holding index.html and the other dashboard assets.
    #[arg(long, env = "MEGALOPOLIS_DASHBOARD_DIR", default_value = "dashboard")]
    pub dashboard_dir: PathBuf,

    /// Defaults to `<dashboard-dir>/status-api.sh`.
    #[arg(long, env = "MEGALOPOLIS_STATUS_SCRIPT")]
    pub status_script: Option<PathBuf>,

    /// Working directory of the status script. Defaults to the parent of the dashboard dir.
    #[arg(long, env = "MEGALOPOLIS_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    #[arg(long, env = "MEGALOPOLIS_STATUS_TIMEOUT_SECS", default_value_t = 30)]
    pub status_timeout_secs: u64,

    /// OTLP endpoint for exporting traces.
    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP endpoint.
    #[arg(long, env = "OTLP_TOKEN")]
    pub otlp_token: Option<String>,
}

fn parent_or_cwd(dir: &Path) -> PathBuf {
    match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl Args {
    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            dashboard_dir: self.dashboard_dir.clone(),
            status_script: self
                .status_script
                .clone()
                .unwrap_or_else(|| self.dashboard_dir.join("status-api.sh")),
            project_root: self
                .project_root
                .clone()
                .unwrap_or_else(|| parent_or_cwd(&self.dashboard_dir)),
            status_timeout: Duration::from_secs(self.status_timeout_secs),
        }
    }
}
