//! JSON-RPC 2.0 error envelopes synthesized by the bridge.
//!
//! The bridge never inspects request or response structure; the only message
//! it authors itself is the error sent back to the caller when an inbound
//! line is not valid JSON.

use serde::Serialize;

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC error code for invalid JSON received by the server.
pub const PARSE_ERROR_CODE: i64 = -32700;

/// Message paired with [`PARSE_ERROR_CODE`].
pub const PARSE_ERROR_MESSAGE: &str = "Parse error";

/// The `error` member of a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    /// Numeric error code.
    pub code: i64,
    /// Short description of the error.
    pub message: String,
    /// Additional detail; for parse errors, the parser's description.
    pub data: String,
}

/// A JSON-RPC 2.0 error response with a `null` id.
///
/// Serializes with members in the order `jsonrpc`, `id`, `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: &'static str,
    /// Always `null`: the id of an unparseable request cannot be known.
    pub id: Option<serde_json::Value>,
    /// Error details.
    pub error: ErrorObject,
}

impl ErrorEnvelope {
    /// Build a `-32700 Parse error` envelope carrying `detail` as its data.
    #[must_use]
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            error: ErrorObject {
                code: PARSE_ERROR_CODE,
                message: PARSE_ERROR_MESSAGE.to_owned(),
                data: detail.into(),
            },
        }
    }

    /// Serialize to a single compact JSON line, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Relay` if serialization fails.
    pub fn to_line(&self) -> crate::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::AppError::Relay(format!("failed to serialise error envelope: {e}")))
    }
}
