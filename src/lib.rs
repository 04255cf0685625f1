#![forbid(unsafe_code)]

//! `mcp-bridge` — relays line-delimited JSON-RPC between a stdio caller and a
//! subordinate server process.

pub mod config;
pub mod errors;
pub mod logging;
pub mod relay;

pub use config::BridgeConfig;
pub use errors::{AppError, Result};
