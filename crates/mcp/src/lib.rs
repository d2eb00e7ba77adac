//! MCP (Model Context Protocol) server library.
//!
//! This crate hosts tools behind MCP over stdio, on top of the `rmcp` SDK.
//! Tools plug in through an explicit [`ToolDefinition`] passed to
//! [`ToolRegistry::register`]; there is no global registry.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use mcp::{SessionLog, Server, ToolDefinition, ToolError, ToolHandler, ToolRegistry};
//! use serde_json::{Map, Value, json};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ToolHandler for Echo {
//!     async fn call(
//!         &self,
//!         arguments: Map<String, Value>,
//!         _log: &dyn SessionLog,
//!     ) -> Result<Value, ToolError> {
//!         Ok(Value::Object(arguments))
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! let mut registry = ToolRegistry::new();
//! registry.register(ToolDefinition::new(
//!     "echo",
//!     "Echo the arguments back",
//!     json!({"type": "object"}),
//!     Arc::new(Echo),
//! )?)?;
//!
//! Server::new("echo-server", "0.1.0", registry).serve_stdio().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod framing;
mod server;
mod tool;

pub use error::{Error, Result, ToolError};
pub use server::Server;
pub use tool::{NoopLog, SessionLog, ToolDefinition, ToolHandler, ToolRegistry};
