//! Structured errors for the recorder boundary

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed JSON or wrong shape on import
    ParseFailure,
    /// Export file could not be written
    IoFailure,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn parse_failure(reason: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ParseFailure, format!("Invalid event log: {}", reason))
    }

    pub fn io_failure(reason: impl fmt::Display) -> Self {
        Self::new(ErrorCode::IoFailure, format!("Export failed: {}", reason))
    }

    pub fn is_parse_failure(&self) -> bool {
        self.code == ErrorCode::ParseFailure
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::parse_failure(&e).with_context(serde_json::json!({
            "line": e.line(),
            "column": e.column(),
        }))
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        // {:#} keeps the context chain on one line
        Self::io_failure(format!("{:#}", e))
    }
}
