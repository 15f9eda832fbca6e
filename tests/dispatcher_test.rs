//! End-to-end tests for the command dispatcher against a scripted HTTP backend

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rstest::rstest;
use tempfile::TempDir;

use cloudland::application::catalog;
use cloudland::application::services::SessionStore;
use cloudland::cli::{Cli, CliError, CliResult, Dispatcher, Outcome};
use cloudland::config::Settings;
use cloudland::domain::{Row, Session, Token, Verb};
use cloudland::infrastructure::di::ServiceContainer;
use cloudland::infrastructure::traits::{HttpReply, RealFileSystem};
use cloudland::util::testing::ScriptedBackend;

const ENDPOINT: &str = "http://cloud.example/api";

fn test_settings(session_cache: PathBuf) -> Settings {
    Settings {
        session_cache,
        ..Settings::default()
    }
}

/// Dispatch `argv` with services built from `settings` and `backend`.
fn run_with(
    settings: Settings,
    backend: &Arc<ScriptedBackend>,
    argv: &[&str],
) -> CliResult<Outcome> {
    let cli = Cli::parse_globals(argv.iter().copied())?;
    let dispatcher = Dispatcher::new(catalog::registry()?);
    dispatcher.dispatch(&cli, argv.iter().copied(), |_| {
        Ok(ServiceContainer::with_deps(
            settings,
            Arc::new(RealFileSystem),
            backend.clone(),
        ))
    })
}

fn run(temp: &TempDir, backend: &Arc<ScriptedBackend>, argv: &[&str]) -> CliResult<Outcome> {
    let settings = test_settings(temp.path().join("session.json"));
    run_with(settings, backend, argv)
}

/// Command line with all credentials set.
fn with_credentials<'a>(command: &[&'a str]) -> Vec<&'a str> {
    let mut argv = vec![
        "cloudland",
        "--endpoint",
        ENDPOINT,
        "--username",
        "admin",
        "--password",
        "abc",
    ];
    argv.extend_from_slice(command);
    argv
}

/// Credentials clap would otherwise pick up from the process environment.
fn clear_credentials_env() {
    for name in ["CLOUDLAND_ENDPOINT", "CLOUDLAND_USERNAME", "CLOUDLAND_PASSWORD"] {
        std::env::remove_var(name);
    }
}

fn rows(outcome: Outcome) -> Vec<Row> {
    match outcome {
        Outcome::Rows { rows, .. } => rows,
        other => panic!("expected rows, got {other:?}"),
    }
}

fn login_reply() -> HttpReply {
    let tokens = vec![Token::new("PHPSESSID", "s3ss10n")];
    HttpReply::ok("").with_tokens(tokens)
}

// ============================================================
// Operations
// ============================================================

#[test]
fn given_credentials_and_no_cache_when_vm_list_then_logs_in_and_renders_rows() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(login_reply())
            .reply_body(r#"["12|centos7|172.16.1.5|web1|5001|running|5901","0"]"#),
    );

    // Act
    let outcome = run(&temp, &backend, &with_credentials(&["vm-list"])).unwrap();

    // Assert
    match outcome {
        Outcome::Rows { header, rows } => {
            assert_eq!(header.join("|"), "VM|IMAGE|IP|NAME|VXLAN|STATUS|VNC");
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].columns()[3], "web1");
        }
        other => panic!("expected rows, got {other:?}"),
    }
    let sent = backend.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].verb, Verb::Mutate);
    assert_eq!(sent[0].fields.get("op"), Some("login"));
    assert_eq!(sent[1].verb, Verb::Read);
    assert_eq!(sent[1].fields.get("action"), Some("get_vm_list"));
    assert_eq!(sent[1].tokens[0].value, "s3ss10n");
    assert!(temp.path().join("session.json").exists());
}

#[test]
fn given_expired_cache_when_vm_list_then_logs_in_again_first() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = test_settings(temp.path().join("session.json"));
    let store = SessionStore::new(Arc::new(RealFileSystem), &settings);
    let long_ago = Utc::now() - Duration::hours(2);
    let tokens = vec![Token::new("PHPSESSID", "old")];
    let stale = Session::new(ENDPOINT, "admin", tokens, long_ago);
    store.save_at(stale, long_ago).unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(login_reply())
            .reply_body(r#"["0"]"#),
    );

    // Act
    let outcome = run(&temp, &backend, &with_credentials(&["vm-list"])).unwrap();

    // Assert: no probe with the stale token, login comes first
    assert!(rows(outcome).is_empty());
    let sent = backend.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].fields.get("op"), Some("login"));
    assert_eq!(sent[1].tokens[0].value, "s3ss10n");
}

#[test]
fn given_valid_cache_when_second_command_then_reuses_session() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(login_reply())
            .reply_body(r#"["0"]"#)
            // second invocation: probe, then the operation
            .reply_body(r#"["0"]"#)
            .reply_body(r#"["5001|test net|admin","0"]"#),
    );
    run(&temp, &backend, &with_credentials(&["vm-list"])).unwrap();

    // Act
    let outcome = run(&temp, &backend, &with_credentials(&["vlan-list"])).unwrap();

    // Assert
    assert_eq!(rows(outcome).len(), 1);
    let sent = backend.requests();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[2].fields.get("action"), Some("get_vm_list"));
    assert_eq!(sent[3].fields.get("action"), Some("get_link_list"));
    assert!(sent.iter().skip(1).all(|r| r.fields.get("op").is_none()));
}

#[test]
fn given_cached_session_rejected_by_server_when_command_then_logs_in_and_runs() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = test_settings(temp.path().join("session.json"));
    let store = SessionStore::new(Arc::new(RealFileSystem), &settings);
    let tokens = vec![Token::new("PHPSESSID", "revoked")];
    store
        .save(Session::new(ENDPOINT, "admin", tokens, Utc::now()))
        .unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply_body(r#"["Not authenticated","1"]"#)
            .reply(login_reply())
            .reply_body(r#"["5001|test net|admin","0"]"#),
    );

    // Act
    let outcome = run(&temp, &backend, &with_credentials(&["vlan-list"])).unwrap();

    // Assert: liveness check with the cached token, fresh login, then the operation
    assert_eq!(rows(outcome).len(), 1);
    let sent = backend.requests();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].fields.get("action"), Some("get_vm_list"));
    assert_eq!(sent[0].tokens[0].value, "revoked");
    assert_eq!(sent[1].fields.get("op"), Some("login"));
    assert_eq!(sent[2].fields.get("action"), Some("get_link_list"));
    assert_eq!(sent[2].tokens[0].value, "s3ss10n");
    let cached = store.load().expect("session cached again");
    assert_eq!(cached.tokens[0].value, "s3ss10n");
}

#[test]
fn given_rejected_request_when_vlan_delete_then_reports_server_message() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(login_reply())
            .reply_body(r#"["Vlan 5001 does not exist.","1"]"#),
    );

    // Act
    let err = run(&temp, &backend, &with_credentials(&["vlan-delete", "5001"])).unwrap_err();

    // Assert
    assert_eq!(err.rejection(), Some("Vlan 5001 does not exist."));
    assert_eq!(err.exit_code(), 1);
    let sent = backend.requests();
    assert_eq!(sent[1].verb, Verb::Mutate);
    assert_eq!(sent[1].fields.get("exec"), Some("clear_net"));
    assert_eq!(sent[1].fields.get("vlan"), Some("5001"));
}

#[test]
fn given_refused_login_when_command_then_auth_failure_and_no_operation() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new().reply_body("Not authenticated"));

    // Act
    let err = run(&temp, &backend, &with_credentials(&["vm-list"])).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), 77);
    assert_eq!(backend.requests().len(), 1);
    assert!(!temp.path().join("session.json").exists());
}

#[test]
fn given_garbage_body_when_command_then_protocol_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(login_reply())
            .reply_body("<html>502 Bad Gateway</html>"),
    );

    // Act
    let err = run(&temp, &backend, &with_credentials(&["image-list"])).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), 76);
    assert!(err.to_string().contains("unexpected response"));
}

#[test]
fn given_unreachable_server_when_command_then_transport_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new().fail("connection refused"));

    // Act
    let err = run(&temp, &backend, &with_credentials(&["vm-list"])).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), 69);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn given_optional_flags_when_vm_create_then_sent_and_unset_omitted() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(login_reply())
            .reply_body(r#"["inst-7|pending","0"]"#),
    );

    let argv = with_credentials(&[
        "vm-create",
        "centos7",
        "5001",
        "--cpu",
        "2",
        "--increase",
        "10",
    ]);

    // Act
    run(&temp, &backend, &argv).unwrap();

    // Assert
    let fields = &backend.requests()[1].fields;
    assert_eq!(fields.get("exec"), Some("launch_vm"));
    assert_eq!(fields.get("cpu"), Some("2"));
    assert_eq!(fields.get("disk_inc"), Some("10"));
    assert!(!fields.contains("memory"));
    assert!(!fields.contains("name"));
}

#[test]
fn given_credentials_from_settings_when_command_then_flags_not_needed() {
    // Arrange
    let temp = TempDir::new().unwrap();
    clear_credentials_env();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(login_reply())
            .reply_body(r#"["0"]"#),
    );
    let settings = Settings {
        endpoint: Some(ENDPOINT.into()),
        username: Some("admin".into()),
        password: Some("a9993e364706816aba3e25717850c26c9cd0d89d".into()),
        ..test_settings(temp.path().join("session.json"))
    };

    // Act
    run_with(settings, &backend, &["cloudland", "volume-list"]).unwrap();

    // Assert: digest passed through unchanged
    let sent = backend.requests();
    assert_eq!(sent[0].url, ENDPOINT);
    assert_eq!(
        sent[0].fields.get("sha1"),
        Some("a9993e364706816aba3e25717850c26c9cd0d89d")
    );
}

// ============================================================
// Local terminal states (no network)
// ============================================================

#[test]
fn given_no_credentials_when_command_then_hint_and_no_network() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new());
    clear_credentials_env();

    // Act
    let err = run(&temp, &backend, &["cloudland", "vm-list"]).unwrap_err();

    // Assert
    assert!(matches!(err, CliError::MissingCredentials { .. }));
    assert!(err.to_string().starts_with("Please check whether"));
    assert_ne!(err.exit_code(), 0);
    assert!(backend.requests().is_empty());
}

#[rstest]
#[case(&["vlan-delete", "five"])]
#[case(&["vlan-delete"])]
#[case(&["vm-create", "centos7"])]
#[case(&["vm-list", "--bogus"])]
#[case(&["no-such-command"])]
#[case(&["vlan-create", "5001", "172.16.1.0", "255.255.255.0", "--shared", "maybe"])]
fn given_bad_arguments_when_dispatch_then_usage_error_without_network(#[case] command: &[&str]) {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new());

    // Act
    let err = run(&temp, &backend, &with_credentials(command)).unwrap_err();

    // Assert
    assert!(matches!(err, CliError::Usage(_)), "unexpected {err:?}");
    assert_eq!(err.exit_code(), 64);
    assert!(backend.requests().is_empty());
}

#[rstest]
#[case(&["cloudland"])]
#[case(&["cloudland", "--help"])]
#[case(&["cloudland", "help"])]
fn given_no_command_or_help_when_dispatch_then_top_level_help(#[case] argv: &[&str]) {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new());

    // Act
    let outcome = run(&temp, &backend, argv).unwrap();

    // Assert
    let Outcome::Help(text) = outcome else {
        panic!("expected help");
    };
    for name in ["vm-list", "vlan-create", "snapshot-delete", "help"] {
        assert!(text.contains(name), "help should list {name}");
    }
    assert!(backend.requests().is_empty());
}

#[rstest]
#[case(&["cloudland", "help", "vlan-create"])]
#[case(&["cloudland", "vlan-create", "--help"])]
#[case(&["cloudland", "vlan-create", "-h"])]
fn given_command_help_when_dispatch_then_lists_its_parameters(#[case] argv: &[&str]) {
    // Arrange
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new());

    // Act
    let outcome = run(&temp, &backend, argv).unwrap();

    // Assert
    let Outcome::Help(text) = outcome else {
        panic!("expected help");
    };
    assert!(text.contains("--use-dhcp"));
    assert!(text.contains("NETMASK"));
    assert!(backend.requests().is_empty());
}

#[test]
fn given_help_for_unknown_command_when_dispatch_then_usage_error() {
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new());

    let err = run(&temp, &backend, &["cloudland", "help", "vm-explode"]).unwrap_err();

    assert_eq!(err.exit_code(), 64);
}

#[test]
fn given_version_flag_when_dispatch_then_version_without_network() {
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new());

    let outcome = run(&temp, &backend, &["cloudland", "--version"]).unwrap();

    assert_eq!(
        outcome,
        Outcome::Version(format!("cloudland {}", env!("CARGO_PKG_VERSION")))
    );
    assert!(backend.requests().is_empty());
}

#[test]
fn given_generate_flag_when_dispatch_then_completion_script() {
    let temp = TempDir::new().unwrap();
    let backend = Arc::new(ScriptedBackend::new());

    let outcome = run(&temp, &backend, &["cloudland", "--generate", "bash"]).unwrap();

    let Outcome::Completions(script) = outcome else {
        panic!("expected completions");
    };
    assert!(script.contains("cloudland"));
    assert!(script.contains("vm-list"));
}

// ============================================================
// Settings are only loaded for operations
// ============================================================

/// Dispatch `argv` loading settings from its `--config` file, as the binary does.
fn run_loading_settings(backend: &Arc<ScriptedBackend>, argv: &[&str]) -> CliResult<Outcome> {
    let cli = Cli::parse_globals(argv.iter().copied())?;
    let dispatcher = Dispatcher::new(catalog::registry()?);
    dispatcher.dispatch(&cli, argv.iter().copied(), |_| {
        let settings = Settings::load(cli.config.as_deref())?;
        Ok(ServiceContainer::with_deps(
            settings,
            Arc::new(RealFileSystem),
            backend.clone(),
        ))
    })
}

fn broken_config(temp: &TempDir) -> String {
    let path = temp.path().join("cloudland.toml");
    fs::write(&path, "endpoint = [").unwrap();
    path.to_string_lossy().into_owned()
}

#[rstest]
#[case(&["--version"])]
#[case(&["--help"])]
#[case(&[])]
#[case(&["help", "vm-list"])]
#[case(&["--generate", "zsh"])]
fn given_broken_config_when_local_command_then_succeeds(#[case] command: &[&str]) {
    // Arrange
    let temp = TempDir::new().unwrap();
    let config = broken_config(&temp);
    let backend = Arc::new(ScriptedBackend::new());
    let mut argv = vec!["cloudland", "--config", config.as_str()];
    argv.extend_from_slice(command);

    // Act
    let outcome = run_loading_settings(&backend, &argv);

    // Assert
    assert!(outcome.is_ok(), "unexpected {outcome:?}");
    assert!(backend.requests().is_empty());
}

#[test]
fn given_broken_config_when_operation_then_config_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let config = broken_config(&temp);
    let backend = Arc::new(ScriptedBackend::new());
    let argv = with_credentials(&["--config", config.as_str(), "vm-list"]);

    // Act
    let err = run_loading_settings(&backend, &argv).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), 78);
    assert!(err.to_string().contains("config error"));
    assert!(backend.requests().is_empty());
}
