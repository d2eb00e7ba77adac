use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied argument violates the tool schema.
    #[error("invalid argument `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The provider rejected the request or could not be reached.
    #[error("{0}")]
    Invocation(String),
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<Error> for mcp::ToolError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { field, reason } => mcp::ToolError::invalid_params(field, reason),
            Error::Invocation(message) => mcp::ToolError::Execution(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
