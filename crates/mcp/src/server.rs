//! MCP server: an SDK [`ServerHandler`] over a [`ToolRegistry`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    LoggingLevel, LoggingMessageNotificationParam, PaginatedRequestParams, ServerCapabilities,
    ServerInfo, SetLevelRequestParams,
};
use rmcp::service::{Peer, RequestContext};
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::framing::{Screened, screen};
use crate::tool::{SessionLog, ToolRegistry};

/// Capacity of the in-process pipes between the line screen and the SDK.
const PIPE_CAPACITY: usize = 64 * 1024;

struct Shared {
    name: String,
    version: String,
    registry: ToolRegistry,
    log_level: AtomicU8,
}

/// An MCP server exposing the tools of a [`ToolRegistry`].
#[derive(Clone)]
pub struct Server {
    shared: Arc<Shared>,
}

impl Server {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        registry: ToolRegistry,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                version: version.into(),
                registry,
                log_level: AtomicU8::new(severity(LoggingLevel::Info)),
            }),
        }
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve until `reader` reaches EOF.
    ///
    /// Lines are screened before they reach the SDK; rejected lines are
    /// answered on `writer` alongside the SDK's own frames.
    pub async fn serve<R, W>(self, mut reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(
            name = %self.shared.name,
            version = %self.shared.version,
            tools = self.shared.registry.len(),
            "MCP server started"
        );

        let (mut inbound, service_in) = tokio::io::duplex(PIPE_CAPACITY);
        let (service_out, outbound) = tokio::io::duplex(PIPE_CAPACITY);

        let session = tokio::spawn(async move {
            let running = ServiceExt::serve(self, (service_in, service_out))
                .await
                .map_err(|e| Error::Session(e.to_string()))?;
            running
                .waiting()
                .await
                .map_err(|e| Error::Session(e.to_string()))?;
            Ok::<_, Error>(())
        });

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_frames(writer, rx));
        let relay = tokio::spawn(relay_frames(outbound, tx.clone()));

        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            match screen(&line) {
                Screened::Skip => {}
                Screened::Forward(message) => {
                    // A closed pipe means the session already ended.
                    if inbound.write_all(message.as_bytes()).await.is_err()
                        || inbound.write_all(b"\n").await.is_err()
                    {
                        break;
                    }
                }
                Screened::Reject(frame) => {
                    warn!(bytes = line.len(), "rejected inbound line");
                    let _ = tx.send(frame);
                }
            }
        }
        drop(inbound);

        let outcome = join(session).await;
        join(relay).await?;
        drop(tx);
        join(writer_task).await?;

        info!("MCP server stopped");
        outcome
    }

    fn notification_log(&self, peer: Peer<RoleServer>, tool: &str) -> NotificationLog {
        NotificationLog {
            peer,
            logger: tool.to_string(),
            enabled: self.shared.log_level.load(Ordering::Relaxed) <= severity(LoggingLevel::Info),
        }
    }
}

impl ServerHandler for Server {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_logging()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: self.shared.name.clone(),
                version: self.shared.version.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.shared.registry.specs()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let name = request.name.as_ref();
        debug!(tool = %name, "tools/call");

        let log = self.notification_log(context.peer, name);
        let arguments = request.arguments.unwrap_or_default();
        match self.shared.registry.call(name, arguments, &log).await {
            Ok(Value::Object(object)) => Ok(CallToolResult::structured(Value::Object(object))),
            Ok(value) => Ok(CallToolResult::success(vec![Content::text(value.to_string())])),
            Err(err) => match err.to_error_data() {
                Some(data) => Err(data),
                None => {
                    warn!(tool = %name, error = %err, "tool call failed");
                    Ok(CallToolResult::error(vec![Content::text(err.to_string())]))
                }
            },
        }
    }

    async fn set_level(
        &self,
        request: SetLevelRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<(), ErrorData> {
        debug!(level = ?request.level, "logging/setLevel");
        self.shared
            .log_level
            .store(severity(request.level), Ordering::Relaxed);
        Ok(())
    }
}

/// Forwards session log lines to the client as `notifications/message`.
struct NotificationLog {
    peer: Peer<RoleServer>,
    logger: String,
    enabled: bool,
}

#[async_trait]
impl SessionLog for NotificationLog {
    async fn log(&self, message: &str) {
        if !self.enabled {
            return;
        }
        let notification = LoggingMessageNotificationParam {
            level: LoggingLevel::Info,
            logger: Some(self.logger.clone()),
            data: Value::String(message.to_string()),
        };
        if let Err(e) = self.peer.notify_logging_message(notification).await {
            debug!(error = %e, "dropped session log line");
        }
    }
}

/// Syslog-style ordering, lowest first.
fn severity(level: LoggingLevel) -> u8 {
    match level {
        LoggingLevel::Debug => 0,
        LoggingLevel::Info => 1,
        LoggingLevel::Notice => 2,
        LoggingLevel::Warning => 3,
        LoggingLevel::Error => 4,
        LoggingLevel::Critical => 5,
        LoggingLevel::Alert => 6,
        LoggingLevel::Emergency => 7,
    }
}

async fn join<T>(task: tokio::task::JoinHandle<Result<T>>) -> Result<T> {
    task.await.map_err(|e| Error::Session(e.to_string()))?
}

/// Copy the SDK's outbound lines onto the shared writer channel.
async fn relay_frames<R>(outbound: R, tx: mpsc::UnboundedSender<String>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(outbound).lines();
    while let Some(line) = lines.next_line().await? {
        if !line.is_empty() && tx.send(line).is_err() {
            break;
        }
    }
    Ok(())
}

async fn write_frames<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
