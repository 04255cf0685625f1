//! Caller writer task.
//!
//! Both pumps produce lines for the caller: the outbound pump forwards server
//! responses and the inbound pump reports parse errors. This task is the only
//! owner of the caller's output stream, so whole lines never interleave.
//! Each received line is written followed by a `\n` byte and flushed
//! immediately.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Capacity of the channel feeding [`run_caller_writer`].
pub const CALLER_QUEUE_DEPTH: usize = 64;

/// Caller writer task: writes each line from `line_rx` to `out` as NDJSON.
///
/// The task runs until every sender is dropped and the queue is drained,
/// which lets the supervisor flush pending responses before exiting.
///
/// # Errors
///
/// Returns [`AppError::Relay`]`("write to caller failed: …")` if the caller's
/// output stream is closed or fails.
pub async fn run_caller_writer<W>(mut out: W, mut line_rx: mpsc::Receiver<String>) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(line) = line_rx.recv().await {
        let mut bytes = line.into_bytes();
        bytes.push(b'\n');

        let written = async {
            out.write_all(&bytes).await?;
            out.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!(error = %e, "caller writer: write to stdout failed");
            return Err(AppError::Relay(format!("write to caller failed: {e}")));
        }
    }

    debug!("caller writer: queue closed, stopping");
    Ok(())
}
