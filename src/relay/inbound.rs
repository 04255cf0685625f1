//! Inbound pump: caller → subordinate server.
//!
//! Reads NDJSON lines from the caller, checks that each is well-formed JSON,
//! and forwards the original text verbatim to the server's stdin. Lines that
//! fail to parse are answered on the caller's output with a JSON-RPC
//! `-32700 Parse error` envelope and are not forwarded.

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::relay::codec::{LineCodec, LineFrame};
use crate::relay::envelope::ErrorEnvelope;
use crate::relay::{check_json, CALLER_TO_SERVER};
use crate::{AppError, Result};

/// What the inbound pump does with one caller line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAction {
    /// Forward these exact bytes (line plus `\n`) to the server.
    Forward(Vec<u8>),
    /// Answer the caller with a parse-error envelope instead.
    Reject {
        /// Why the line was refused.
        reason: String,
        /// Serialized envelope line for the caller.
        reply: String,
    },
}

/// Decide how to handle one line received from the caller.
///
/// Valid JSON is forwarded as received, never re-serialized, so the server
/// sees exactly what the caller sent. Has no side effects; the pump does the
/// tracing.
///
/// # Errors
///
/// Returns `AppError::Relay` only if the error envelope cannot be serialized.
pub fn classify_inbound(line: &str) -> Result<InboundAction> {
    match check_json(line) {
        Ok(()) => {
            let mut bytes = Vec::with_capacity(line.len() + 1);
            bytes.extend_from_slice(line.as_bytes());
            bytes.push(b'\n');
            Ok(InboundAction::Forward(bytes))
        }
        Err(e) => reject(e.to_string()),
    }
}

fn reject(reason: String) -> Result<InboundAction> {
    let reply = ErrorEnvelope::parse_error(&reason).to_line()?;
    Ok(InboundAction::Reject { reason, reply })
}

/// Inbound pump task.
///
/// Drives a [`FramedRead`] over `caller_in` and, per line, either writes the
/// line to `server_in` or queues a parse-error envelope on `caller_tx`.
///
/// When `caller_in` reaches EOF the task returns and drops `server_in`, which
/// closes the server's stdin so it can observe end-of-input and exit.
///
/// # Cancellation
///
/// Respects `cancel`: when the token fires the task exits without reading
/// further input.
///
/// # Errors
///
/// - [`AppError::Relay`]`("write to server failed: …")` if the server's stdin
///   is closed (typically because the server exited).
/// - [`AppError::Io`] if reading the caller's input fails.
pub async fn run_inbound<R, W>(
    caller_in: R,
    mut server_in: W,
    caller_tx: mpsc::Sender<String>,
    max_line_bytes: usize,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut framed = FramedRead::new(caller_in, LineCodec::with_max_length(max_line_bytes));

    loop {
        let frame = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("inbound pump: cancellation received, stopping");
                return Ok(());
            }

            frame = framed.next() => frame,
        };

        let action = match frame {
            None => {
                info!("caller input closed, closing server stdin");
                return Ok(());
            }
            Some(Err(e)) => {
                warn!(error = %e, "inbound pump: read from caller failed, stopping");
                return Err(e);
            }
            Some(Ok(LineFrame::Rejected(reason))) => reject(reason)?,
            Some(Ok(LineFrame::Line(line))) => {
                let action = classify_inbound(&line)?;
                if matches!(action, InboundAction::Forward(_)) {
                    info!(direction = CALLER_TO_SERVER, line = line.as_str(), "forwarding");
                }
                action
            }
        };

        match action {
            InboundAction::Forward(bytes) => {
                let written = async {
                    server_in.write_all(&bytes).await?;
                    server_in.flush().await
                }
                .await;

                if let Err(e) = written {
                    warn!(error = %e, "inbound pump: write to server stdin failed");
                    return Err(AppError::Relay(format!("write to server failed: {e}")));
                }
            }
            InboundAction::Reject { reason, reply } => {
                warn!(
                    direction = CALLER_TO_SERVER,
                    error = reason.as_str(),
                    "error parsing request"
                );
                if caller_tx.send(reply).await.is_err() {
                    debug!("inbound pump: caller writer closed, stopping");
                    return Ok(());
                }
            }
        }
    }
}
