//! NDJSON line codec shared by both relay directions.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so an
//! unterminated or oversized message from either peer cannot exhaust memory.
//!
//! # Usage
//!
//! Use [`LineCodec`] as the codec parameter for
//! [`tokio_util::codec::FramedRead`]. Lines are delimited by `\n`; a trailing
//! `\r` is stripped, and the returned text never contains the delimiter.
//!
//! Lines that cannot be delivered as text (too long, not UTF-8) are yielded as
//! [`LineFrame::Rejected`] rather than as decoder errors. A decoder error makes
//! `FramedRead` report end-of-stream on the following poll, which would end a
//! pump on a single bad line.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Default maximum line length accepted by [`LineCodec`]: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Prefix of the rejection reason produced for oversized lines.
pub const LINE_TOO_LONG: &str = "line too long";

/// One decoded unit of a newline-delimited stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFrame {
    /// A complete UTF-8 line, without its delimiter.
    Line(String),
    /// A line that was consumed but could not be decoded as text.
    Rejected(String),
}

/// Newline-delimited UTF-8 line codec with a bounded line length.
///
/// # Decoder
///
/// Lines longer than the configured limit yield
/// [`LineFrame::Rejected`]`("line too long: …")`. The codec then discards input
/// up to the next newline, so the following line decodes normally. Lines that
/// are not valid UTF-8 yield [`LineFrame::Rejected`] with the decoding error.
/// Only failures of the underlying reader surface as [`AppError::Io`].
#[derive(Debug)]
pub struct LineCodec {
    inner: LinesCodec,
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec that rejects lines longer than `max_len` bytes.
    #[must_use]
    pub fn with_max_length(max_len: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_len),
            max_len,
        }
    }

    /// Maximum accepted line length in bytes.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_len
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = LineFrame;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let decoded = self.inner.decode(src);
        Ok(into_frame(decoded, self.max_len))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let decoded = self.inner.decode_eof(src);
        Ok(into_frame(decoded, self.max_len))
    }
}

// ── Private helper ────────────────────────────────────────────────────────────

/// Fold a [`LinesCodec`] result into a [`LineFrame`].
///
/// `LinesCodec` performs no I/O of its own, so its `Io` variant only ever
/// carries a UTF-8 decoding failure for a line it has already split off.
fn into_frame(
    decoded: std::result::Result<Option<String>, LinesCodecError>,
    max_len: usize,
) -> Option<LineFrame> {
    match decoded {
        Ok(line) => line.map(LineFrame::Line),
        Err(LinesCodecError::MaxLineLengthExceeded) => Some(LineFrame::Rejected(format!(
            "{LINE_TOO_LONG}: exceeded {max_len} bytes"
        ))),
        Err(LinesCodecError::Io(err)) => Some(LineFrame::Rejected(format!("invalid utf-8: {err}"))),
    }
}
