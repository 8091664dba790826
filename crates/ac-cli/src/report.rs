use ac_api::Application;
use ac_core::AdminResult;
use ac_runtime::OperationResponse;
use serde::Serialize;

use crate::map_report_json;

/// Exit code for a line that ran but did not succeed.
pub(crate) const EXIT_FAILED: i32 = 2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckReport {
    pub(crate) console_name: String,
    pub(crate) templates: usize,
    pub(crate) procedures: usize,
    pub(crate) commands: usize,
    pub(crate) operations: usize,
}

impl CheckReport {
    pub(crate) fn of(application: &Application) -> Self {
        let summary = application.summary();
        Self {
            console_name: application.settings().console_name.clone(),
            templates: summary.templates,
            procedures: summary.procedures,
            commands: summary.commands,
            operations: summary.operations,
        }
    }
}

pub(crate) fn emit_response(response: &OperationResponse) -> i32 {
    println!(
        "RESULT:{}",
        if response.succeeded { "OK" } else { "FAILED" }
    );
    for message in &response.messages {
        println!(
            "MESSAGE_JSON:{}",
            serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string())
        );
    }
    if response.succeeded {
        0
    } else {
        EXIT_FAILED
    }
}

pub(crate) fn emit_check(report: &CheckReport) -> AdminResult<i32> {
    let payload = serde_json::to_string(report).map_err(map_report_json)?;
    println!("RESULT:OK");
    println!("SUMMARY_JSON:{}", payload);
    Ok(0)
}
