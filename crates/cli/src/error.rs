//! CLI error types.

use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Settings could not be resolved; the server cannot start.
    #[error(
        "Failed to load settings. Ensure METASO_API_KEY is set in the environment or .env.local. {0}"
    )]
    Settings(#[from] metaso::ConfigError),

    /// A one-shot search failed.
    #[error(transparent)]
    Search(#[from] metaso::Error),

    /// The MCP host failed to register tools or serve.
    #[error(transparent)]
    Mcp(#[from] mcp::Error),

    #[error("failed to render result: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
