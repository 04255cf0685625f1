//! Unit tests for the NDJSON line codec.
//!
//! Covers framing of complete, batched, and partial lines, carriage-return
//! stripping, and the rejection of oversized and non-UTF-8 lines without
//! ending the stream.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use mcp_bridge::relay::codec::{LineCodec, LineFrame, LINE_TOO_LONG, MAX_LINE_BYTES};

fn line(text: &str) -> Option<LineFrame> {
    Some(LineFrame::Line(text.to_owned()))
}

// ── Framing ──────────────────────────────────────────────────────────────────

/// A complete JSON object on one newline-terminated line is returned without
/// the trailing newline.
#[test]
fn single_line_decodes_without_delimiter() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");

    let frame = codec.decode(&mut buf).expect("decode must succeed");

    assert_eq!(frame, line("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}"));
    assert!(buf.is_empty(), "the delimiter must be consumed");
}

/// Two lines delivered in one buffer decode as two separate frames.
#[test]
fn batched_lines_are_each_decoded() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":1}\n{\"id\":2}\n");

    assert_eq!(codec.decode(&mut buf).expect("first"), line("{\"id\":1}"));
    assert_eq!(codec.decode(&mut buf).expect("second"), line("{\"id\":2}"));
    assert_eq!(codec.decode(&mut buf).expect("drained"), None);
}

/// A line that arrives without its newline is held back until the newline
/// arrives.
#[test]
fn partial_line_is_buffered_until_newline() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":");

    assert_eq!(codec.decode(&mut buf).expect("partial"), None);

    buf.extend_from_slice(b"3}\n");
    assert_eq!(codec.decode(&mut buf).expect("complete"), line("{\"id\":3}"));
}

/// Windows-style `\r\n` endings do not leak a `\r` into the line.
#[test]
fn carriage_return_is_stripped() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":4}\r\n");

    assert_eq!(codec.decode(&mut buf).expect("decode"), line("{\"id\":4}"));
}

/// An empty line is still a line; whether it is valid JSON is decided later.
#[test]
fn empty_line_is_yielded() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("\n");

    assert_eq!(codec.decode(&mut buf).expect("decode"), line(""));
}

/// Text left without a trailing newline at end-of-stream is still delivered.
#[test]
fn unterminated_final_line_is_yielded_at_eof() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":5}");

    assert_eq!(codec.decode(&mut buf).expect("decode"), None);
    assert_eq!(codec.decode_eof(&mut buf).expect("eof"), line("{\"id\":5}"));
    assert_eq!(codec.decode_eof(&mut buf).expect("eof again"), None);
}

// ── Rejections ───────────────────────────────────────────────────────────────

/// A line over the limit is rejected once, and the line after it decodes
/// normally.
#[test]
fn oversized_line_is_rejected_and_stream_recovers() {
    let mut codec = LineCodec::with_max_length(16);
    let mut buf = BytesMut::from("{\"padding\":\"xxxxxxxxxxxxxxxxxxxxxxxx\"}\n{\"id\":6}\n");

    match codec.decode(&mut buf).expect("decode must not error") {
        Some(LineFrame::Rejected(reason)) => {
            assert!(reason.starts_with(LINE_TOO_LONG), "got: {reason}");
            assert!(reason.contains("16"), "reason must name the limit: {reason}");
        }
        other => panic!("expected a rejected frame, got {other:?}"),
    }

    assert_eq!(codec.decode(&mut buf).expect("next line"), line("{\"id\":6}"));
}

/// Bytes that are not UTF-8 are rejected without affecting the next line.
#[test]
fn invalid_utf8_line_is_rejected() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(&b"\xff\xfe\n{\"id\":7}\n"[..]);

    match codec.decode(&mut buf).expect("decode must not error") {
        Some(LineFrame::Rejected(reason)) => {
            assert!(reason.starts_with("invalid utf-8"), "got: {reason}");
        }
        other => panic!("expected a rejected frame, got {other:?}"),
    }

    assert_eq!(codec.decode(&mut buf).expect("next line"), line("{\"id\":7}"));
}

// ── Limits ───────────────────────────────────────────────────────────────

#[test]
fn default_limit_is_one_mebibyte() {
    assert_eq!(MAX_LINE_BYTES, 1_048_576);
    assert_eq!(LineCodec::new().max_length(), MAX_LINE_BYTES);
    assert_eq!(LineCodec::default().max_length(), MAX_LINE_BYTES);
}
