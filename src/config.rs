//! Bridge configuration parsing, validation, and override resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::relay::codec::MAX_LINE_BYTES;
use crate::relay::spawner::SpawnConfig;
use crate::{AppError, Result};

/// Environment variable consulted when neither the CLI nor the config file
/// names the subordinate server executable.
pub const SERVER_ENV_VAR: &str = "MCP_BRIDGE_SERVER";

fn default_max_line_bytes() -> usize {
    MAX_LINE_BYTES
}

/// Bridge configuration parsed from an optional `config.toml`.
///
/// Every field has a default so an empty file (or no file at all) is valid;
/// the server command may instead come from the command line or from
/// [`SERVER_ENV_VAR`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BridgeConfig {
    /// Subordinate server executable.
    #[serde(default)]
    pub server_command: String,
    /// Arguments passed to the server executable.
    #[serde(default)]
    pub server_args: Vec<String>,
    /// Working directory for the server process; inherited when absent.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Longest accepted NDJSON line, in bytes, on either stream.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_command: String::new(),
            server_args: Vec::new(),
            working_dir: None,
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replaces `server_command` when set.
    pub server: Option<String>,
    /// Replaces `server_args` when non-empty.
    pub server_args: Vec<String>,
}

impl BridgeConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and the environment fallback, then make
    /// sure a server command is known.
    ///
    /// Precedence for the server command is `overrides.server`, then the
    /// config file, then [`SERVER_ENV_VAR`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if no source provides a server command.
    pub fn resolve(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(server) = overrides.server {
            self.server_command = server;
        }
        if !overrides.server_args.is_empty() {
            self.server_args = overrides.server_args;
        }

        if self.server_command.trim().is_empty() {
            match env::var(SERVER_ENV_VAR) {
                Ok(value) if !value.trim().is_empty() => {
                    debug!(var = SERVER_ENV_VAR, "server command taken from environment");
                    self.server_command = value;
                }
                _ => {
                    return Err(AppError::Config(format!(
                        "no server command: pass --server, set server_command, or export {SERVER_ENV_VAR}"
                    )));
                }
            }
        }

        Ok(self)
    }

    /// Launch parameters for the subordinate process.
    #[must_use]
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            command: self.server_command.clone(),
            args: self.server_args.clone(),
            working_dir: self.working_dir.clone(),
        }
    }

    fn validate(&mut self) -> Result<()> {
        if self.max_line_bytes == 0 {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }

        if let Some(dir) = &self.working_dir {
            let canonical = dir
                .canonicalize()
                .map_err(|err| AppError::Config(format!("working_dir invalid: {err}")))?;
            self.working_dir = Some(canonical);
        }

        Ok(())
    }
}
