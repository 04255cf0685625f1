//! Outbound pump: subordinate server → caller.
//!
//! Reads NDJSON lines from the server's stdout, parses each one, and hands a
//! compact re-serialization to the caller writer. Lines that are not valid
//! JSON are logged and dropped; no error envelope is sent to the caller for
//! them.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::relay::codec::{LineCodec, LineFrame};
use crate::relay::{check_json, SERVER_TO_CALLER};
use crate::{AppError, Result};

/// Parse one server line and re-serialize it for the caller.
///
/// Object member order is preserved, so compact input comes back unchanged.
/// A well-formed line that [`serde_json::Value`] cannot hold (nesting past its
/// recursion limit, a lone surrogate escape, a number outside `f64` range) is
/// passed on as received, minus surrounding whitespace.
///
/// # Errors
///
/// Returns [`AppError::Relay`]`("malformed json: …")` if the line is not
/// valid JSON.
pub fn reencode_outbound(line: &str) -> Result<String> {
    check_json(line).map_err(|e| AppError::Relay(format!("malformed json: {e}")))?;

    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => serde_json::to_string(&value)
            .map_err(|e| AppError::Relay(format!("failed to serialise response: {e}"))),
        Err(e) => {
            debug!(
                direction = SERVER_TO_CALLER,
                error = %e,
                "response kept as received"
            );
            Ok(line.trim().to_owned())
        }
    }
}

/// Outbound pump task.
///
/// Drives a [`FramedRead`] over `server_out` and sends each valid message to
/// `caller_tx`. Returns when the server's stdout reaches EOF, when the caller
/// writer goes away, or when `cancel` fires.
///
/// # Errors
///
/// Returns [`AppError::Io`] if reading the server's stdout fails.
pub async fn run_outbound<R>(
    server_out: R,
    caller_tx: mpsc::Sender<String>,
    max_line_bytes: usize,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(server_out, LineCodec::with_max_length(max_line_bytes));

    loop {
        let frame = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("outbound pump: cancellation received, stopping");
                return Ok(());
            }

            frame = framed.next() => frame,
        };

        match frame {
            None => {
                debug!("outbound pump: server stdout closed");
                return Ok(());
            }
            Some(Err(e)) => {
                warn!(error = %e, "outbound pump: read from server failed, stopping");
                return Err(e);
            }
            Some(Ok(LineFrame::Rejected(reason))) => {
                warn!(
                    direction = SERVER_TO_CALLER,
                    error = reason.as_str(),
                    "dropping unreadable response line"
                );
            }
            Some(Ok(LineFrame::Line(line))) => match reencode_outbound(&line) {
                Ok(encoded) => {
                    info!(direction = SERVER_TO_CALLER, line = line.as_str(), "forwarding");
                    if caller_tx.send(encoded).await.is_err() {
                        debug!("outbound pump: caller writer closed, stopping");
                        return Ok(());
                    }
                }
                Err(e) => {
                    // Dropped without notifying the caller.
                    warn!(
                        direction = SERVER_TO_CALLER,
                        error = %e,
                        "error parsing response"
                    );
                }
            },
        }
    }
}
