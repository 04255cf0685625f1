//! Subordinate server process spawner.
//!
//! Launches the server the bridge fronts with:
//! - piped `stdin`/`stdout`, so the bridge owns request/response framing;
//! - inherited `stderr`, so server diagnostics reach the operator unmodified.
//!
//! The child is not `kill_on_drop`: on shutdown the bridge sends
//! `SIGTERM` and exits at once, and a drop-time `SIGKILL` would pre-empt the
//! server's own cleanup.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::info;

use crate::{AppError, Result};

/// Launch parameters for the subordinate server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Server executable (path or name resolved via `PATH`).
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory for the child; inherited when `None`.
    pub working_dir: Option<PathBuf>,
}

/// A running subordinate server and its piped stdio halves.
///
/// The supervisor keeps `child` and hands `stdin` to the inbound pump and
/// `stdout` to the outbound pump.
#[derive(Debug)]
pub struct Subordinate {
    /// Child process handle.
    pub child: Child,
    /// Server's stdin, written by the inbound pump.
    pub stdin: ChildStdin,
    /// Server's stdout, read by the outbound pump.
    pub stdout: ChildStdout,
}

/// Spawn the subordinate server described by `config`.
///
/// # Errors
///
/// - `AppError::Spawn("failed to start …")` — OS spawn failure (missing
///   executable, permission denied, bad working directory).
/// - `AppError::Spawn("failed to capture …")` — a stdio pipe was not created.
pub fn spawn_subordinate(config: &SpawnConfig) -> Result<Subordinate> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args);

    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = cmd.spawn().map_err(|err| {
        AppError::Spawn(format!("failed to start {}: {err}", config.command))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture server stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture server stdout".into()))?;

    info!(
        command = config.command.as_str(),
        pid = child.id(),
        "subordinate server started"
    );

    Ok(Subordinate {
        child,
        stdin,
        stdout,
    })
}

/// Ask the subordinate to terminate without waiting for it to exit.
///
/// On Unix this sends `SIGTERM` so the server can clean up; elsewhere, and if
/// the signal cannot be delivered, the process is killed outright. On Unix,
/// calling this on a process that has already been reaped is a no-op.
///
/// # Errors
///
/// Returns `AppError::Spawn` if the process could not be signalled at all.
pub fn terminate(child: &mut Child) -> Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = child.id() else {
            // Already reaped.
            return Ok(());
        };

        match i32::try_from(pid) {
            Ok(raw) => match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::warn!(pid, %err, "SIGTERM delivery failed, killing server");
                }
            },
            Err(err) => {
                tracing::warn!(pid, %err, "pid out of range, killing server");
            }
        }
    }

    child
        .start_kill()
        .map_err(|err| AppError::Spawn(format!("failed to kill server: {err}")))
}
