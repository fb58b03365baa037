use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub dashboard_dir: PathBuf,
    pub status_script: PathBuf,
    pub project_root: PathBuf,
    pub status_timeout: Duration,
}

impl DashboardConfig {
    /// Resolve every path to an absolute one and make sure the status script is runnable.
    ///
    /// The script path is made absolute because it is spawned with `project_root` as the
    /// working directory.
    pub fn resolve(self) -> anyhow::Result<Self> {
        let status_script = self.status_script.canonicalize().with_context(|| {
            format!("status script not found at {}", self.status_script.display())
        })?;
        make_executable(&status_script)?;

        let dashboard_dir = self.dashboard_dir.canonicalize().with_context(|| {
            format!("dashboard directory not found at {}", self.dashboard_dir.display())
        })?;
        let project_root = self.project_root.canonicalize().with_context(|| {
            format!("project root not found at {}", self.project_root.display())
        })?;

        Ok(Self {
            dashboard_dir,
            status_script,
            project_root,
            status_timeout: self.status_timeout,
        })
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    if perms.mode() & 0o777 != 0o755 {
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to chmod {}", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}
