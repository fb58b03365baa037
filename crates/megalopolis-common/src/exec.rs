use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("failed to collect output of `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::Timeout { .. })
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

fn program_name(cmd: &Command) -> String {
    cmd.as_std().get_program().to_string_lossy().into_owned()
}

fn args_of(cmd: &Command) -> Vec<String> {
    cmd.as_std()
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

/// Kills a child's whole process group when dropped, unless disarmed.
///
/// The child is made leader of its own group at spawn time, so anything it starts in
/// the background dies with it.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    #[cfg(unix)]
    fn kill(&mut self) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pgid) = self.pgid.take() {
            if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                // ESRCH: the group already exited
                tracing::debug!(pgid, error=%e, "killpg failed");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Run `cmd` to completion, capturing stdout and stderr, bounded by `timeout`.
///
/// On unix the child leads a new process group. On timeout, and on every other early
/// return including the future being dropped, the whole group is killed; the direct
/// child is also spawned with `kill_on_drop`. A non-zero exit is not an error here;
/// callers inspect [`CommandOutput::code`].
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
) -> Result<CommandOutput, ExecError> {
    let program = program_name(&cmd);
    let args = args_of(&cmd);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let child = cmd.spawn().map_err(|source| {
        tracing::error!(%program, ?args, error=%source, "failed to spawn command");
        ExecError::Spawn {
            program: program.clone(),
            source,
        }
    })?;
    let mut group = ProcessGroup::new(child.id());

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(res) => res.map_err(|source| ExecError::Io {
            program: program.clone(),
            source,
        })?,
        Err(_) => {
            group.kill();
            tracing::warn!(%program, ?args, ?timeout, "command timed out, process group killed");
            return Err(ExecError::Timeout { program, timeout });
        }
    };
    group.disarm();

    let out = CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    tracing::debug!(
        %program,
        ?args,
        code = ?out.code,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "command finished"
    );

    Ok(out)
}

/// Spawn `cmd` without waiting for it. Output is discarded.
///
/// Returns as soon as the process exists; the child keeps running after the caller
/// returns and is reaped by a background task. Must be called inside a tokio runtime.
pub fn spawn_detached(mut cmd: Command) -> Result<Option<u32>, ExecError> {
    let program = program_name(&cmd);
    let args = args_of(&cmd);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false);

    let mut child = cmd.spawn().map_err(|source| {
        tracing::error!(%program, ?args, error=%source, "failed to spawn detached command");
        ExecError::Spawn {
            program: program.clone(),
            source,
        }
    })?;

    let pid = child.id();
    tracing::info!(%program, ?args, ?pid, "detached command spawned");

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => tracing::info!(%program, ?pid, %status, "detached command exited"),
            Err(e) => tracing::warn!(%program, ?pid, error=%e, "failed to reap detached command"),
        }
    });

    Ok(pid)
}
