use std::rc::Rc;

use ac_core::{AdminResult, DataValue, ValueType};
use serde::Serialize;

use crate::storage::Storage;

pub mod builtin;
mod context;
pub mod factory;
mod procedure;
mod template;

pub use context::{ExecutionEnv, OperationContext};
pub use procedure::ProcedureTask;
pub use template::{OperationConstructor, OperationTemplate, TemplateKind, OPERATION_TEMPLATE_TYPE};

pub const KEY_OPERATION_NAME: &str = "operation-name";
pub const KEY_ERROR_MESSAGE: &str = "error-message";
pub const KEY_SUCCESS_MESSAGE: &str = "success-message";
pub const KEY_REPORT_ERRORS: &str = "report-errors";
pub const KEY_EXECUTOR: &str = "executor";

/// Variables every operation understands.
pub const COMMON_VARIABLES: [&str; 3] = [KEY_ERROR_MESSAGE, KEY_SUCCESS_MESSAGE, KEY_REPORT_ERRORS];

/// A single executable unit. Instances live for one execution.
pub trait Operation {
    fn run(&self, context: &Rc<OperationContext>) -> AdminResult<OperationResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResponse {
    pub succeeded: bool,
    pub messages: Vec<String>,
}

impl OperationResponse {
    pub fn succeeded() -> Self {
        Self {
            succeeded: true,
            messages: Vec::new(),
        }
    }

    pub fn succeeded_with(message: impl Into<String>) -> Self {
        Self::succeeded().with_message(message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::failed_silently().with_message(message)
    }

    pub fn failed_silently() -> Self {
        Self {
            succeeded: false,
            messages: Vec::new(),
        }
    }

    pub fn of(succeeded: bool) -> Self {
        Self {
            succeeded,
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn with_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.messages.extend(messages.into_iter().map(Into::into));
        self
    }
}

/// Response shaping shared by every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSettings {
    pub name: String,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub report_errors: bool,
}

impl OperationSettings {
    pub fn from_storage(storage: &Storage) -> AdminResult<Self> {
        Ok(Self {
            name: storage.get_and_assert_text(KEY_OPERATION_NAME)?,
            error_message: storage.get_text(KEY_ERROR_MESSAGE),
            success_message: storage.get_text(KEY_SUCCESS_MESSAGE),
            report_errors: storage
                .get_or(KEY_REPORT_ERRORS, &ValueType::Bool, DataValue::Bool(true))
                .as_bool()
                .unwrap_or(true),
        })
    }

    /// Success messages replace the messages of a successful response.
    /// Failures take the custom error message, or lose their messages when
    /// errors are not reported.
    pub fn apply(&self, response: OperationResponse) -> OperationResponse {
        if response.succeeded {
            return match &self.success_message {
                Some(message) => OperationResponse::succeeded_with(message.clone()),
                None => response,
            };
        }
        match &self.error_message {
            Some(message) => OperationResponse::failed(message.clone()),
            None if !self.report_errors => OperationResponse::failed_silently(),
            None => response,
        }
    }
}

#[cfg(test)]
mod operation_tests {
    use super::*;

    fn settings(error: Option<&str>, success: Option<&str>, report: bool) -> OperationSettings {
        OperationSettings {
            name: "op".to_string(),
            error_message: error.map(ToString::to_string),
            success_message: success.map(ToString::to_string),
            report_errors: report,
        }
    }

    #[test]
    fn success_message_replaces_output() {
        let response = OperationResponse::succeeded_with("raw");
        let shaped = settings(None, Some("done"), true).apply(response.clone());
        assert_eq!(shaped.messages, vec!["done"]);
        assert_eq!(settings(None, None, true).apply(response.clone()), response);
        assert_eq!(settings(Some("bad"), None, true).apply(response.clone()), response);
    }

    #[test]
    fn failures_follow_error_settings() {
        let response = OperationResponse::failed("raw");
        assert_eq!(
            settings(Some("custom"), None, false).apply(response.clone()).messages,
            vec!["custom"]
        );
        let silent = settings(None, None, false).apply(response.clone());
        assert!(!silent.succeeded);
        assert!(silent.messages.is_empty());
        assert_eq!(settings(None, None, true).apply(response.clone()), response);
    }

    #[test]
    fn settings_read_from_storage() {
        let storage = Storage::new(Rc::new(ac_convert::ConversionEngine::new()));
        assert_eq!(
            OperationSettings::from_storage(&storage).expect_err("name").code,
            "INPUT_MISSING"
        );
        storage.set(KEY_OPERATION_NAME, DataValue::from("info"));
        storage.set(KEY_REPORT_ERRORS, DataValue::from("no"));
        let settings = OperationSettings::from_storage(&storage).expect("settings");
        assert_eq!(settings.name, "info");
        assert!(!settings.report_errors);
        assert_eq!(settings.error_message, None);
    }

    #[test]
    fn responses_serialize_for_callers() {
        let response = OperationResponse::failed("nope").with_messages(["hint"]);
        let json = serde_json::to_string(&response).expect("json");
        assert_eq!(json, r#"{"succeeded":false,"messages":["nope","hint"]}"#);
    }
}
