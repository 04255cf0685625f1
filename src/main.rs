#![forbid(unsafe_code)]

//! `mcp-bridge` — stdio JSON-RPC relay binary.
//!
//! Resolves configuration, launches the subordinate server, relays NDJSON
//! between this process's stdio and the server's, and exits with the server's
//! exit code (or 0 when interrupted).

use std::future::Future;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use mcp_bridge::config::{BridgeConfig, ConfigOverrides};
use mcp_bridge::logging::{init_tracing, LogFormat};
use mcp_bridge::relay::{Relay, RelayOutcome};
use mcp_bridge::Result;

/// Exit code for configuration and launch failures.
const FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Parser)]
#[command(
    name = "mcp-bridge",
    about = "Relay line-delimited JSON-RPC between stdio and a subordinate server",
    version,
    long_about = None
)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server executable; overrides `server_command` from the config file.
    #[arg(long)]
    server: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Arguments passed to the server; override `server_args`.
    #[arg(last = true)]
    server_args: Vec<String>,
}

fn main() {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("mcp-bridge: {err}");
        std::process::exit(FAILURE_EXIT_CODE);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to build tokio runtime");
            std::process::exit(FAILURE_EXIT_CODE);
        }
    };

    let code = runtime.block_on(async {
        run(args).await.unwrap_or_else(|err| {
            error!(%err, "bridge failed");
            FAILURE_EXIT_CODE
        })
    });

    // Stdin is read on a blocking thread that cannot be interrupted; do not
    // wait for it.
    runtime.shutdown_background();
    std::process::exit(code);
}

async fn run(args: Cli) -> Result<i32> {
    // ── Resolve configuration ───────────────────────────
    let config = match &args.config {
        Some(path) => BridgeConfig::load_from_path(path)?,
        None => BridgeConfig::default(),
    };
    let config = config.resolve(ConfigOverrides {
        server: args.server,
        server_args: args.server_args,
    })?;
    info!(
        server = config.server_command.as_str(),
        args = ?config.server_args,
        "configuration loaded"
    );

    // Install handlers before the server exists.
    let shutdown = shutdown_signal();

    // ── Launch the server ───────────────────────────────
    let relay = Relay::start(&config)?;

    // ── Relay until the server exits or we are signalled ─
    let outcome = relay
        .run(tokio::io::stdin(), tokio::io::stdout(), shutdown)
        .await;

    match outcome {
        RelayOutcome::ServerExited { code } => {
            info!(?code, "server exited, bridge stopping");
        }
        RelayOutcome::Interrupted => info!("bridge interrupted"),
    }

    Ok(outcome.exit_code())
}

/// Install SIGINT and SIGTERM handlers and return a future that resolves on
/// the first of them.
///
/// Registration happens when this is called, not when the future is first
/// polled. A handler that fails to install never resolves, so the bridge keeps
/// running until the server exits instead of shutting down at once.
#[cfg(unix)]
fn shutdown_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::SignalKind;

    let interrupt = register(SignalKind::interrupt(), "SIGINT");
    let terminate = register(SignalKind::terminate(), "SIGTERM");

    async move {
        tokio::select! {
            () = recv_or_pending(interrupt) => info!("SIGINT received"),
            () = recv_or_pending(terminate) => info!("SIGTERM received"),
        }
    }
}

#[cfg(unix)]
fn register(
    kind: tokio::signal::unix::SignalKind,
    name: &str,
) -> Option<tokio::signal::unix::Signal> {
    match tokio::signal::unix::signal(kind) {
        Ok(signal) => Some(signal),
        Err(err) => {
            error!(%err, signal = name, "failed to register signal handler");
            None
        }
    }
}

#[cfg(unix)]
async fn recv_or_pending(signal: Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(mut signal) => {
            signal.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Resolves on the first ctrl-c.
#[cfg(not(unix))]
fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "ctrl-c signal handler failed");
            std::future::pending::<()>().await;
        }
    }
}
