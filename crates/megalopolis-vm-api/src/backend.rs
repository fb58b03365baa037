use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use megalopolis_common::{run_with_timeout, spawn_detached};

use crate::error::VmError;
use crate::listing::{parse_listing, VmRecord, DEFAULT_HEADER_TOKEN};

/// Source of truth for VM state. The facade keeps nothing between calls.
#[async_trait]
pub trait VmBackend: Send + Sync {
    /// Current listing, in the order the backend reports it.
    async fn list(&self) -> Result<Vec<VmRecord>, VmError>;

    /// First record whose name equals `name`.
    async fn find(&self, name: &str) -> Result<Option<VmRecord>, VmError> {
        Ok(self.list().await?.into_iter().find(|vm| vm.name == name))
    }

    /// Launch the VM without waiting for it to come up.
    async fn start(&self, name: &str) -> Result<(), VmError>;

    /// Stop the VM and wait for the command to finish.
    async fn stop(&self, name: &str) -> Result<(), VmError>;
}

#[derive(Debug, Clone)]
pub struct CliVmConfig {
    pub bin: String,
    pub header_token: String,
    pub run_flags: Vec<String>,
    pub list_timeout: Duration,
    pub stop_timeout: Duration,
}

impl Default for CliVmConfig {
    fn default() -> Self {
        Self {
            bin: "tart".to_string(),
            header_token: DEFAULT_HEADER_TOKEN.to_string(),
            run_flags: vec!["--no-graphics".to_string()],
            list_timeout: Duration::from_secs(10),
            stop_timeout: Duration::from_secs(30),
        }
    }
}

/// Drives an external VM management binary (`list`, `run`, `stop` subcommands).
#[derive(Debug, Clone)]
pub struct CliVmBackend {
    config: CliVmConfig,
}

impl CliVmBackend {
    pub fn new(config: CliVmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CliVmConfig {
        &self.config
    }

    fn command(&self) -> Command {
        Command::new(&self.config.bin)
    }
}

#[async_trait]
impl VmBackend for CliVmBackend {
    async fn list(&self) -> Result<Vec<VmRecord>, VmError> {
        let mut cmd = self.command();
        cmd.arg("list");

        let out = run_with_timeout(cmd, self.config.list_timeout).await?;
        if !out.success() {
            tracing::warn!(
                bin=%self.config.bin,
                code=?out.code,
                stderr=%out.stderr.trim(),
                "vm list failed, reporting empty listing"
            );
            return Ok(Vec::new());
        }
        Ok(parse_listing(&out.stdout, &self.config.header_token))
    }

    async fn start(&self, name: &str) -> Result<(), VmError> {
        let mut cmd = self.command();
        cmd.arg("run").arg(name).args(&self.config.run_flags);
        spawn_detached(cmd)?;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), VmError> {
        let mut cmd = self.command();
        cmd.arg("stop").arg(name);

        let out = run_with_timeout(cmd, self.config.stop_timeout).await?;
        if out.success() {
            tracing::info!(vm=%name, "vm stopped");
            Ok(())
        } else {
            Err(VmError::CommandFailed {
                code: out.code,
                stderr: out.stderr,
            })
        }
    }
}
