//! Tool registration seam between the host and tool implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::Tool;
use serde_json::{Map, Value};

use crate::error::{Error, Result, ToolError};

/// Diagnostic sink for the session that invoked a tool.
///
/// Logging is best-effort: implementations must never fail the call.
#[async_trait]
pub trait SessionLog: Send + Sync {
    async fn log(&self, message: &str);
}

/// A session log that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLog;

#[async_trait]
impl SessionLog for NoopLog {
    async fn log(&self, _message: &str) {}
}

/// Executes a tool invocation with already-decoded JSON arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        arguments: Map<String, Value>,
        log: &dyn SessionLog,
    ) -> std::result::Result<Value, ToolError>;
}

/// Everything the host needs to expose one tool.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Arc<Map<String, Value>>,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    /// Fails with [`Error::InvalidSchema`] unless `input_schema` is an object.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self> {
        let name = name.into();
        let Value::Object(input_schema) = input_schema else {
            return Err(Error::InvalidSchema(name));
        };
        Ok(Self {
            name,
            description: description.into(),
            input_schema: Arc::new(input_schema),
            handler,
        })
    }

    /// Listing entry for tools/list.
    pub fn spec(&self) -> Tool {
        Tool::new(
            self.name.clone(),
            self.description.clone(),
            Arc::clone(&self.input_schema),
        )
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Tools exposed by a server, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: ToolDefinition) -> Result<()> {
        if self.index.contains_key(&tool.name) {
            return Err(Error::DuplicateTool(tool.name));
        }
        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn specs(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::spec).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by name and run it.
    pub async fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        log: &dyn SessionLog,
    ) -> std::result::Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.handler.call(arguments, log).await
    }
}
