//! Binary integration tests.
//!
//! Spawns the compiled adapters and talks to them over stdin/stdout.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Output, Stdio};

const QUERY_BIN: &str = env!("CARGO_BIN_EXE_impyla-query");
const RENDER_BIN: &str = env!("CARGO_BIN_EXE_impyla-render");

fn run(bin: &str, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(bin)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn adapter");
    // The adapter may exit before reading, e.g. on a usage error.
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().unwrap()
}

fn response(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.ends_with('\n'), "missing trailing newline: {stdout:?}");
    serde_json::from_str(&stdout).unwrap()
}

#[test]
fn test_render_success() {
    let output = run(
        RENDER_BIN,
        &[],
        r#"{"template": "{{ a }}-{{ b }}", "variables": {"a": "X", "b": 2}}"#,
    );

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        response(&output),
        json!({"success": true, "rendered": "X-2", "loaded_plugins": []})
    );
}

#[test]
fn test_render_failure_still_exits_zero() {
    let output = run(RENDER_BIN, &[], r#"{"template": "{{ missing }}"}"#);

    assert_eq!(output.status.code(), Some(0));
    let response = response(&output);
    assert_eq!(response["success"], json!(false));
    assert_eq!(response["error_type"], json!("UndefinedError"));
}

#[test]
fn test_malformed_input() {
    for bin in [QUERY_BIN, RENDER_BIN] {
        let output = run(bin, &[], "not json");

        assert_eq!(output.status.code(), Some(1));
        let response = response(&output);
        assert_eq!(response["success"], json!(false));
        assert_eq!(response["error_type"], json!("MalformedInputError"));
    }
}

#[test]
fn test_wrong_shape_is_malformed() {
    let output = run(QUERY_BIN, &[], r#"{"sql": "SELECT 1"}"#);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(response(&output)["error_type"], json!("MalformedInputError"));
}

#[test]
fn test_query_connection_error() {
    let output = run(
        QUERY_BIN,
        &[],
        r#"{"connection": {"host": "bad-host", "port": 21050, "timeout": 5}, "sql": "SELECT 1"}"#,
    );

    assert_eq!(output.status.code(), Some(0));
    let response = response(&output);
    assert_eq!(response["success"], json!(false));
    assert_eq!(response["error_type"], json!("ConnectionError"));
    assert!(response.get("rows").is_none());
}

#[test]
fn test_input_file_and_pretty() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"template": "SELECT {{{{ n }}}}", "variables": {{"n": 1}}}}"#).unwrap();

    let output = run(
        RENDER_BIN,
        &["--input", file.path().to_str().unwrap(), "--pretty"],
        "",
    );

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\n  \"rendered\": \"SELECT 1\""), "{stdout}");
}

#[test]
fn test_plugin_warnings_go_to_stderr() {
    let output = run(
        RENDER_BIN,
        &[],
        r#"{"template": "ok", "plugin_paths": ["/nonexistent/macros"]}"#,
    );

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(response(&output)["rendered"], json!("ok"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/nonexistent/macros"), "{stderr}");
}

#[test]
fn test_unknown_flag_reports_json() {
    for bin in [QUERY_BIN, RENDER_BIN] {
        let output = run(bin, &["--bogus"], "{}");

        assert_eq!(output.status.code(), Some(1));
        let response = response(&output);
        assert_eq!(response["success"], json!(false));
        assert_eq!(response["error_type"], json!("UsageError"));
    }
}

#[test]
fn test_non_utf8_stdin_is_malformed() {
    let mut child = Command::new(RENDER_BIN)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn adapter");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(&[0xff, 0xfe, 0x80])
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(response(&output)["error_type"], json!("MalformedInputError"));
}

#[test]
fn test_empty_substituted_host_is_malformed() {
    let output = Command::new(QUERY_BIN)
        .env("IMPYLA_BRIDGE_CLI_EMPTY_HOST", "")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .and_then(|mut child| {
            child
                .stdin
                .take()
                .unwrap()
                .write_all(br#"{"connection": {"host": "${IMPYLA_BRIDGE_CLI_EMPTY_HOST}"}, "sql": "SELECT 1"}"#)?;
            child.wait_with_output()
        })
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(response(&output)["error_type"], json!("MalformedInputError"));
}
