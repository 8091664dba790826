use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("ops")
}

fn ac_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ac-cli"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("cli should execute")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn check_reports_the_fixture_configuration() {
    let dir = fixture_dir();
    let output = ac_cli(&["check", "--config-dir", dir.to_string_lossy().as_ref()]);
    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));
    let stdout = stdout(&output);
    assert!(stdout.contains("RESULT:OK"));
    assert!(stdout.contains("\"consoleName\":\"ops\""));
    assert!(stdout.contains("\"procedures\":1"));
    assert!(stdout.contains("\"commands\":3"));
}

#[test]
fn exec_runs_configured_commands() {
    let dir = fixture_dir();
    let dir = dir.to_string_lossy();
    let output = ac_cli(&["exec", "--config-dir", dir.as_ref(), "list operations"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("MESSAGE_JSON:\"Registry: Operations\""));

    let output = ac_cli(&["exec", "--config-dir", dir.as_ref(), "name limit abcd"]);
    assert_eq!(output.status.code(), Some(2));
    let stdout = stdout(&output);
    assert!(stdout.contains("RESULT:FAILED"));
    assert!(stdout.contains("Input cannot be longer than 3 characters."));
}

#[test]
fn exec_respects_user_access() {
    let dir = fixture_dir();
    let dir = dir.to_string_lossy();
    let output = ac_cli(&["exec", "--config-dir", dir.as_ref(), "--user", "bo", "name check bob"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("You are not allowed to use this command."));

    let output = ac_cli(&["exec", "--config-dir", dir.as_ref(), "--user", "ann", "name check bob"]);
    assert_eq!(output.status.code(), Some(0));

    let output = ac_cli(&["exec", "--config-dir", dir.as_ref(), "--user", "cy", "help"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("ERROR_CODE:API_UNKNOWN_USER"));
}

#[test]
fn missing_config_dir_is_an_error() {
    let output = ac_cli(&["check", "--config-dir", "/definitely/not/here"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("ERROR_CODE:CONFIG_DIR_NOT_FOUND"));
}
