//! Metaso search exposed as an MCP tool.
//!
//! The crate is a pass-through: it validates tool arguments, forwards one
//! HTTP request to the Metaso search API, and hands back the provider's JSON
//! without interpreting it.
//!
//! # Overview
//!
//! - **SettingsProvider**: resolves credential, base URL and timeout from
//!   `METASO_*` variables and `.env.local`, once per process.
//! - **MetasoClient**: builds the provider request and maps failures to
//!   [`Error::Invocation`].
//! - **SearchTool**: the `metaso_search` tool definition, registered with an
//!   [`mcp::ToolRegistry`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use metaso::{MetasoClient, SettingsProvider, register_search_tool};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = SettingsProvider::from_process().get()?;
//! let client = Arc::new(MetasoClient::new(settings));
//!
//! let mut registry = mcp::ToolRegistry::new();
//! register_search_tool(&mut registry, client)?;
//!
//! mcp::Server::new("metaso-search", "0.1.0", registry)
//!     .serve_stdio()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod settings;
pub mod tool;

pub use client::{DEFAULT_SCOPE, DEFAULT_SIZE, MetasoClient, SearchRequest};
pub use error::{Error, Result};
pub use settings::{ConfigError, Settings, SettingsProvider};
pub use tool::{MAX_RESULTS, SearchTool, TOOL_NAME, register_search_tool, search_once};
