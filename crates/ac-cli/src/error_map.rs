use std::fmt::Display;

use ac_core::{AdminError, ErrorKind};

fn map_error(code: &'static str, error: impl Display) -> AdminError {
    AdminError::new(ErrorKind::Dispatch, code, error.to_string())
}

pub(crate) fn emit_error(error: AdminError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}

pub(crate) fn map_console_io(error: std::io::Error) -> AdminError {
    map_error("CLI_CONSOLE_IO", error)
}

pub(crate) fn map_report_json(error: serde_json::Error) -> AdminError {
    map_error("CLI_REPORT_JSON", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(AdminError::config("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(map_console_io(std::io::Error::other("io")).code, "CLI_CONSOLE_IO");
        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_report_json(invalid).code, "CLI_REPORT_JSON");
    }
}
