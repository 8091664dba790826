use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Conversion,
    Path,
    InvalidInput,
    Construction,
    Dispatch,
    Config,
}

#[derive(Debug, Error, Clone)]
#[error("{code}: {message}")]
pub struct AdminError {
    pub code: String,
    pub message: String,
    pub kind: ErrorKind,
}

pub type AdminResult<T> = Result<T, AdminError>;

impl AdminError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            kind,
        }
    }

    pub fn conversion(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conversion, code, message)
    }

    pub fn path(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Path, code, message)
    }

    pub fn invalid_input(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, code, message)
    }

    pub fn construction(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Construction, code, message)
    }

    pub fn dispatch(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dispatch, code, message)
    }

    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, code, message)
    }

    /// Appends the load step that was running when the error surfaced.
    pub fn with_action(mut self, action: impl Display) -> Self {
        self.message = format!("{} (while {})", self.message, action);
        self
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind == ErrorKind::InvalidInput
    }

    /// Re-tags a lower level failure as invalid input, keeping its message.
    pub fn into_invalid_input(self, code: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, code, self.message)
    }
}
