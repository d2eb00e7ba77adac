//! The `metaso_search` tool: argument schema, validation, and dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use mcp::{NoopLog, SessionLog, ToolDefinition, ToolError, ToolHandler, ToolRegistry};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::client::{DEFAULT_SCOPE, DEFAULT_SIZE, MetasoClient, SearchRequest};
use crate::{Error, Result};

pub const TOOL_NAME: &str = "metaso_search";
pub const TOOL_DESCRIPTION: &str = "Query the Metaso search API and return the raw JSON result.";

/// Upper bound for `size`.
pub const MAX_RESULTS: u32 = 50;

/// Bridges tool invocations to a [`MetasoClient`].
#[derive(Debug, Clone)]
pub struct SearchTool {
    client: Arc<MetasoClient>,
}

impl SearchTool {
    pub fn new(client: Arc<MetasoClient>) -> Self {
        Self { client }
    }

    /// JSON Schema advertised in tools/list.
    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural-language search query",
                    "minLength": 1
                },
                "scope": {
                    "type": "string",
                    "description": "Metaso search scope (e.g. webpage, weibo, zhihu)",
                    "minLength": 1,
                    "default": DEFAULT_SCOPE,
                    "examples": [DEFAULT_SCOPE]
                },
                "size": {
                    "type": "integer",
                    "description": "Number of results to return (1-50)",
                    "minimum": 1,
                    "maximum": MAX_RESULTS,
                    "default": DEFAULT_SIZE
                },
                "include_summary": {
                    "type": "boolean",
                    "description": "Ask Metaso to include the summary field",
                    "default": false
                },
                "include_raw_content": {
                    "type": "boolean",
                    "description": "Include the raw page content field",
                    "default": false
                },
                "concise_snippet": {
                    "type": "boolean",
                    "description": "Return condensed snippets",
                    "default": false
                }
            },
            "required": ["query"]
        })
    }

    pub fn definition(self) -> mcp::Result<ToolDefinition> {
        ToolDefinition::new(
            TOOL_NAME,
            TOOL_DESCRIPTION,
            Self::input_schema(),
            Arc::new(self),
        )
    }

    /// Validate a request and run it, logging to `log` around the call.
    pub async fn run(&self, request: &SearchRequest, log: &dyn SessionLog) -> Result<Value> {
        validate(request)?;

        log.log(&format!(
            "Running Metaso search query={:?} scope={:?} size={}",
            request.query, request.scope, request.size
        ))
        .await;

        let results = self.client.search(request).await?;

        let count = result_count(&results);
        debug!(count, "Metaso search returned");
        log.log(&format!("Metaso returned {count} items.")).await;

        Ok(results)
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    async fn call(
        &self,
        arguments: Map<String, Value>,
        log: &dyn SessionLog,
    ) -> std::result::Result<Value, ToolError> {
        let request = parse_arguments(&arguments)?;
        Ok(self.run(&request, log).await?)
    }
}

/// Register `metaso_search` with the host.
pub fn register_search_tool(
    registry: &mut ToolRegistry,
    client: Arc<MetasoClient>,
) -> mcp::Result<()> {
    registry.register(SearchTool::new(client).definition()?)
}

/// Run a search without a session, e.g. from the command line.
pub async fn search_once(client: Arc<MetasoClient>, request: &SearchRequest) -> Result<Value> {
    SearchTool::new(client).run(request, &NoopLog).await
}

/// Decode tool arguments, applying defaults for absent or null fields.
pub fn parse_arguments(arguments: &Map<String, Value>) -> Result<SearchRequest> {
    let present = |field: &str| arguments.get(field).filter(|v| !v.is_null());

    let query = match present("query") {
        Some(value) => string_field("query", value)?,
        None => return Err(Error::validation("query", "field required")),
    };

    let mut request = SearchRequest::new(query);
    if let Some(value) = present("scope") {
        request.scope = string_field("scope", value)?;
    }
    if let Some(value) = present("size") {
        request.size = size_field(value)?;
    }
    if let Some(value) = present("include_summary") {
        request.include_summary = bool_field("include_summary", value)?;
    }
    if let Some(value) = present("include_raw_content") {
        request.include_raw_content = bool_field("include_raw_content", value)?;
    }
    if let Some(value) = present("concise_snippet") {
        request.concise_snippet = bool_field("concise_snippet", value)?;
    }

    validate(&request)?;
    Ok(request)
}

/// Enforce the declared bounds before anything touches the network.
pub fn validate(request: &SearchRequest) -> Result<()> {
    if request.query.is_empty() {
        return Err(Error::validation("query", "must not be empty"));
    }
    if request.scope.is_empty() {
        return Err(Error::validation("scope", "must not be empty"));
    }
    if !(1..=MAX_RESULTS).contains(&request.size) {
        return Err(Error::validation(
            "size",
            format!("must be between 1 and {MAX_RESULTS}, got {}", request.size),
        ));
    }
    Ok(())
}

fn string_field(field: &'static str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::validation(field, format!("expected a string, got {value}")))
}

fn bool_field(field: &'static str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::validation(field, format!("expected a boolean, got {value}")))
}

fn size_field(value: &Value) -> Result<u32> {
    // Integral floats such as 10.0 are accepted.
    let n = match (value.as_i64(), value.as_f64()) {
        (Some(n), _) => n,
        (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => f as i64,
        _ => {
            return Err(Error::validation(
                "size",
                format!("expected an integer, got {value}"),
            ));
        }
    };
    u32::try_from(n).map_err(|_| {
        Error::validation("size", format!("must be between 1 and {MAX_RESULTS}, got {n}"))
    })
}

/// Best-effort hit count: `data`, else `items`, when it is an array.
fn result_count(results: &Value) -> usize {
    ["data", "items"]
        .iter()
        .filter_map(|key| results.get(key))
        .find(|value| is_truthy(value))
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
