use super::*;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use ac_config::ConfigDirectory;

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("file should be written");
}

fn config_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_file(
        dir.path(),
        "application.yml",
        "console-name: ops\nusers:\n  - name: bo\n",
    );
    write_file(
        dir.path(),
        "commands.yml",
        "commands:\n  show:\n    operation: info\n    arguments:\n      value: { variable: target }\n",
    );
    dir
}

fn application(dir: &Path) -> Application {
    let directory: ConfigDirectory =
        load_config_dir(dir.to_string_lossy().as_ref()).expect("config dir should load");
    create_application(ApplicationOptions::from(directory)).expect("application")
}

fn console_output(application: &Application, user: Option<&str>, input: &str) -> String {
    let mut reader = Cursor::new(input.as_bytes().to_vec());
    let mut writer = Vec::new();
    let code = console::run_console_with_io(application, user, &mut reader, &mut writer)
        .expect("console should run");
    assert_eq!(code, 0);
    String::from_utf8(writer).expect("utf8")
}

#[test]
fn console_runs_lines_until_quit() {
    let dir = config_dir();
    let application = application(dir.path());
    let output = console_output(&application, None, "show hello\n\nquit\nshow never\n");
    assert!(output.starts_with("ops console\n"));
    assert!(output.contains("Text: hello\n"));
    assert!(output.contains("Shutting down ops.\n"));
    assert!(!output.contains("never"));
    assert!(!application.is_running());
}

#[test]
fn console_stops_at_end_of_input() {
    let dir = config_dir();
    let application = application(dir.path());
    let output = console_output(&application, Some("bo"), "quit\n");
    assert!(output.contains("You are not allowed to use this command.\n"));
    assert!(application.is_running());
}

#[test]
fn console_rejects_unknown_users() {
    let dir = config_dir();
    let application = application(dir.path());
    let mut reader = Cursor::new(b"show x\n".to_vec());
    let mut writer = Vec::new();
    let error = console::run_console_with_io(&application, Some("cy"), &mut reader, &mut writer)
        .expect_err("unknown user");
    assert_eq!(error.code, "API_UNKNOWN_USER");
}

#[test]
fn prompt_input_trims_line_endings() {
    let mut reader = Cursor::new(b"help\r\n".to_vec());
    let mut writer = Vec::new();
    let line = console::prompt_input_from("> ", &mut reader, &mut writer).expect("read");
    assert_eq!(line.as_deref(), Some("help"));
    assert_eq!(writer, b"> ");
    let line = console::prompt_input_from("> ", &mut reader, &mut writer).expect("eof");
    assert!(line.is_none());
}

#[test]
fn execute_as_defaults_to_the_console_user() {
    let dir = config_dir();
    let application = application(dir.path());
    let response = execute_as(&application, None, "show hi").expect("console");
    assert_eq!(response.messages, vec!["Text: hi"]);
    let response = execute_as(&application, Some("bo"), "show hi").expect("bo");
    assert!(response.succeeded);
}

#[test]
fn check_report_counts_registrations() {
    let dir = config_dir();
    let application = application(dir.path());
    let report = CheckReport::of(&application);
    assert_eq!(report.console_name, "ops");
    assert_eq!(report.commands, 2);
    assert_eq!(report.procedures, 0);
    assert_eq!(emit_check(&report).expect("emit"), 0);
}

#[test]
fn responses_map_to_exit_codes() {
    assert_eq!(emit_response(&OperationResponse::succeeded_with("ok")), 0);
    assert_eq!(
        emit_response(&OperationResponse::failed("no")),
        report::EXIT_FAILED
    );
}

#[test]
fn run_cli_reports_load_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing");
    let code = run_cli_from_args([
        "ac-cli",
        "check",
        "--config-dir",
        missing.to_string_lossy().as_ref(),
    ]);
    assert_eq!(code, 1);
}

#[test]
fn run_cli_rejects_bad_arguments() {
    assert_eq!(run_cli_from_args(["ac-cli", "exec"]), 2);
}
