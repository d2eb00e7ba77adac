//! MCP error types.

use rmcp::ErrorData;
use serde_json::json;
use thiserror::Error;

/// Host-level errors (registration, transport).
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("input schema of `{0}` must be a JSON object")]
    InvalidSchema(String),

    /// The MCP session failed to start or ended abnormally.
    #[error("MCP session failed: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors a tool handler reports back to the invoking session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// An argument violates the tool's declared schema.
    #[error("invalid argument `{field}`: {message}")]
    InvalidParams { field: String, message: String },

    #[error("tool not found: {0}")]
    NotFound(String),

    /// The tool ran but failed; the message is shown to the caller verbatim.
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn invalid_params(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Protocol-level error for failures that never reached the tool body.
    ///
    /// Returns `None` for execution failures, which travel inside a
    /// `CallToolResult` with `isError` set instead.
    pub fn to_error_data(&self) -> Option<ErrorData> {
        match self {
            Self::InvalidParams { field, .. } => Some(ErrorData::invalid_params(
                self.to_string(),
                Some(json!({ "field": field })),
            )),
            Self::NotFound(name) => Some(ErrorData::invalid_params(
                self.to_string(),
                Some(json!({ "name": name })),
            )),
            Self::Execution(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn invalid_params_carry_the_field() {
        let data = ToolError::invalid_params("size", "too big")
            .to_error_data()
            .unwrap();
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(data.message, "invalid argument `size`: too big");
        assert_eq!(data.data, Some(json!({"field": "size"})));
    }

    #[test]
    fn unknown_tool_is_invalid_params() {
        let data = ToolError::NotFound("nope".into()).to_error_data().unwrap();
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(data.data, Some(json!({"name": "nope"})));
    }

    #[test]
    fn execution_failures_stay_in_band() {
        assert!(ToolError::Execution("boom".into()).to_error_data().is_none());
    }
}
