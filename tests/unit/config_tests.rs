use std::path::PathBuf;

use mcp_bridge::config::{BridgeConfig, ConfigOverrides, SERVER_ENV_VAR};
use mcp_bridge::relay::codec::MAX_LINE_BYTES;
use mcp_bridge::AppError;

fn sample_toml(workspace: &str) -> String {
    format!(
        r#"
server_command = "/usr/local/bin/keyboard-mcp"
server_args = ["--stdio", "--verbose"]
working_dir = '{workspace}'
max_line_bytes = 4096
"#
    )
}

fn canonical(path: &std::path::Path) -> PathBuf {
    path.canonicalize().expect("canonical path")
}

// ── Parsing ──────────────────────────────────────────────────────────────────

#[test]
fn parses_valid_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = sample_toml(temp.path().to_str().expect("utf8 path"));

    let config = BridgeConfig::from_toml_str(&toml).expect("config parses");

    assert_eq!(config.server_command, "/usr/local/bin/keyboard-mcp");
    assert_eq!(config.server_args, vec!["--stdio", "--verbose"]);
    assert_eq!(config.max_line_bytes, 4096);
    assert_eq!(config.working_dir, Some(canonical(temp.path())));
}

#[test]
fn empty_config_uses_defaults() {
    let config = BridgeConfig::from_toml_str("").expect("empty config parses");

    assert_eq!(config, BridgeConfig::default());
    assert!(config.server_command.is_empty());
    assert!(config.server_args.is_empty());
    assert_eq!(config.working_dir, None);
    assert_eq!(config.max_line_bytes, MAX_LINE_BYTES);
}

#[test]
fn zero_max_line_bytes_is_rejected() {
    let result = BridgeConfig::from_toml_str("max_line_bytes = 0");

    match result {
        Err(AppError::Config(msg)) => assert!(msg.contains("max_line_bytes"), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn missing_working_dir_is_rejected() {
    let result = BridgeConfig::from_toml_str("working_dir = '/definitely/not/a/real/dir'");

    match result {
        Err(AppError::Config(msg)) => assert!(msg.contains("working_dir"), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn invalid_toml_is_a_config_error() {
    let result = BridgeConfig::from_toml_str("server_args = \"not-a-list\"");

    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "server_command = \"server\"\n").expect("write config");

    let config = BridgeConfig::load_from_path(&path).expect("load");

    assert_eq!(config.server_command, "server");
}

#[test]
fn load_from_missing_path_is_a_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");

    let result = BridgeConfig::load_from_path(temp.path().join("absent.toml"));

    match result {
        Err(AppError::Config(msg)) => assert!(msg.contains("failed to read config"), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

// ── Override resolution ──────────────────────────────────────────────────────

#[test]
fn cli_server_overrides_config_file() {
    let config = BridgeConfig::from_toml_str("server_command = \"from-file\"\nserver_args = [\"a\"]")
        .expect("parse");

    let resolved = config
        .resolve(ConfigOverrides {
            server: Some("from-cli".into()),
            server_args: vec!["b".into(), "c".into()],
        })
        .expect("resolve");

    assert_eq!(resolved.server_command, "from-cli");
    assert_eq!(resolved.server_args, vec!["b", "c"]);
}

#[test]
fn empty_cli_args_keep_file_args() {
    let config = BridgeConfig::from_toml_str("server_command = \"srv\"\nserver_args = [\"a\"]")
        .expect("parse");

    let resolved = config
        .resolve(ConfigOverrides::default())
        .expect("resolve");

    assert_eq!(resolved.server_command, "srv");
    assert_eq!(resolved.server_args, vec!["a"]);
}

#[test]
#[serial_test::serial]
fn env_var_is_used_when_nothing_else_names_a_server() {
    std::env::set_var(SERVER_ENV_VAR, "from-env");

    let resolved = BridgeConfig::default().resolve(ConfigOverrides::default());

    std::env::remove_var(SERVER_ENV_VAR);
    assert_eq!(resolved.expect("resolve").server_command, "from-env");
}

#[test]
#[serial_test::serial]
fn config_file_wins_over_env_var() {
    std::env::set_var(SERVER_ENV_VAR, "from-env");

    let resolved = BridgeConfig::from_toml_str("server_command = \"from-file\"")
        .expect("parse")
        .resolve(ConfigOverrides::default());

    std::env::remove_var(SERVER_ENV_VAR);
    assert_eq!(resolved.expect("resolve").server_command, "from-file");
}

#[test]
#[serial_test::serial]
fn missing_server_command_is_a_config_error() {
    std::env::remove_var(SERVER_ENV_VAR);

    let result = BridgeConfig::default().resolve(ConfigOverrides::default());

    match result {
        Err(AppError::Config(msg)) => assert!(msg.contains(SERVER_ENV_VAR), "got: {msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn spawn_config_mirrors_resolved_fields() {
    let config = BridgeConfig {
        server_command: "srv".into(),
        server_args: vec!["--stdio".into()],
        ..BridgeConfig::default()
    };

    let spawn = config.spawn_config();

    assert_eq!(spawn.command, "srv");
    assert_eq!(spawn.args, vec!["--stdio"]);
    assert_eq!(spawn.working_dir, None);
}
