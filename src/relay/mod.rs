//! Bidirectional NDJSON relay between the caller and the subordinate server.
//!
//! A [`Relay`] owns the single server process for its whole lifetime. Running
//! it starts three tasks that share nothing but channels:
//!
//! - `inbound`: caller input → server stdin ([`inbound::run_inbound`]);
//! - `outbound`: server stdout → caller writer ([`outbound::run_outbound`]);
//! - `writer`: sole owner of the caller's output ([`writer::run_caller_writer`]).
//!
//! The supervising future then waits for the first of two events: the server
//! exiting, or the shutdown future resolving (an interrupt or termination
//! signal in the binary). Both paths are terminal.
//!
//! Submodules:
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based line framing.
//! - `envelope`: JSON-RPC error envelope synthesis.
//! - `spawner`: server process launch and termination.

pub mod codec;
pub mod envelope;
pub mod inbound;
pub mod outbound;
pub mod spawner;
pub mod writer;

use std::future::Future;

use serde::de::IgnoredAny;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::relay::spawner::{spawn_subordinate, terminate, Subordinate};
use crate::relay::writer::{run_caller_writer, CALLER_QUEUE_DEPTH};
use crate::Result;

/// Diagnostic direction tag for caller → server traffic.
pub const CALLER_TO_SERVER: &str = "caller→subordinate";

/// Diagnostic direction tag for server → caller traffic.
pub const SERVER_TO_CALLER: &str = "subordinate→caller";

/// Exit code reported when the server ends without one (killed by a signal).
pub const DEFAULT_EXIT_CODE: i32 = 1;

/// Check that `line` holds exactly one well-formed JSON document.
///
/// Both directions use this test. It places no limit on nesting depth, string
/// escapes, or number magnitude, so anything `JSON.parse` accepts passes.
pub(crate) fn check_json(line: &str) -> std::result::Result<(), serde_json::Error> {
    serde_json::from_str::<IgnoredAny>(line).map(|_| ())
}

/// How a relay run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The server process terminated on its own.
    ServerExited {
        /// The server's exit code, if it reported one.
        code: Option<i32>,
    },
    /// The shutdown future fired; the server was told to terminate.
    Interrupted,
}

impl RelayOutcome {
    /// Process exit code the bridge should report for this outcome.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::ServerExited { code } => code.unwrap_or(DEFAULT_EXIT_CODE),
            Self::Interrupted => 0,
        }
    }
}

/// A started relay: the running server plus framing limits.
#[derive(Debug)]
pub struct Relay {
    subordinate: Subordinate,
    max_line_bytes: usize,
}

impl Relay {
    /// Launch the server described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` if the server cannot be started.
    pub fn start(config: &BridgeConfig) -> Result<Self> {
        let subordinate = spawn_subordinate(&config.spawn_config())?;
        Ok(Self::new(subordinate, config.max_line_bytes))
    }

    /// Wrap an already spawned server.
    #[must_use]
    pub fn new(subordinate: Subordinate, max_line_bytes: usize) -> Self {
        Self {
            subordinate,
            max_line_bytes,
        }
    }

    /// Pump messages until the server exits or `shutdown` resolves.
    ///
    /// On server exit, everything the server already wrote to stdout is
    /// delivered to the caller before returning. On shutdown, the server is
    /// sent a termination request and the call returns without waiting for
    /// it to exit.
    ///
    /// Per-line and per-task failures are logged and never end the run early.
    pub async fn run<R, W, S>(self, caller_in: R, caller_out: W, shutdown: S) -> RelayOutcome
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let Subordinate {
            mut child,
            stdin,
            stdout,
        } = self.subordinate;
        let max = self.max_line_bytes;
        let cancel = CancellationToken::new();
        let (caller_tx, caller_rx) = mpsc::channel::<String>(CALLER_QUEUE_DEPTH);

        let writer = tokio::spawn(run_caller_writer(caller_out, caller_rx));
        let inbound = tokio::spawn(inbound::run_inbound(
            caller_in,
            stdin,
            caller_tx.clone(),
            max,
            cancel.clone(),
        ));
        let mut outbound = tokio::spawn(outbound::run_outbound(
            stdout,
            caller_tx,
            max,
            cancel.clone(),
        ));

        tokio::pin!(shutdown);
        info!("relay running");

        let status = tokio::select! {
            status = child.wait() => status,
            () = &mut shutdown => {
                interrupt(&mut child, &cancel);
                return RelayOutcome::Interrupted;
            }
        };

        let code = match status {
            Ok(status) => status.code(),
            Err(err) => {
                warn!(%err, "error waiting for server process");
                None
            }
        };
        info!(?code, "server exited");

        // Deliver whatever the server wrote before exiting.
        tokio::select! {
            joined = &mut outbound => log_task_end("outbound", joined),
            () = &mut shutdown => {
                cancel.cancel();
                return RelayOutcome::Interrupted;
            }
        }

        cancel.cancel();
        log_task_end("inbound", inbound.await);
        log_task_end("writer", writer.await);

        RelayOutcome::ServerExited { code }
    }
}

/// Forward termination to the server and stop the pumps, without waiting.
fn interrupt(child: &mut tokio::process::Child, cancel: &CancellationToken) {
    info!("shutdown requested, terminating server");
    if let Err(err) = terminate(child) {
        error!(%err, "failed to terminate server");
    }
    cancel.cancel();
}

fn log_task_end(task: &str, joined: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => debug!(task, "relay task finished"),
        Ok(Err(err)) => warn!(task, %err, "relay task ended with error"),
        Err(err) => error!(task, %err, "relay task panicked or was aborted"),
    }
}
