//! MCP server with stdio transport
//!
//! Reads newline-delimited JSON-RPC requests and answers each one before
//! reading the next.

use serde_json::{Value, json};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::{debug, error, info, warn};

use super::protocol::{
    CallToolParams, CallToolResult, InitializeParams, JSONRPC_VERSION, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ToolDescriptor, negotiate_protocol_version,
};
use crate::error::{Result, ToolError};
use crate::tools::{ToolOutput, ToolRegistry};

/// Longest request line accepted, excluding the trailing newline
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Name and version reported in the `initialize` handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "append_file".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

enum Frame {
    Line,
    Oversized,
    Eof,
}

/// Reads one newline-terminated frame into `buf` without the newline.
///
/// A frame longer than `limit` is discarded through its newline.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', buf)
        .await?;

    if read == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(Frame::Line);
    }
    if buf.len() > limit {
        buf.clear();
        skip_line(reader).await?;
        return Ok(Frame::Oversized);
    }
    // final line without a trailing newline
    Ok(Frame::Line)
}

async fn skip_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(i) => {
                reader.consume(i + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// MCP server that handles JSON-RPC requests over stdio
pub struct McpServer {
    info: ServerInfo,
    tools: ToolRegistry,
    max_line_bytes: usize,
}

impl McpServer {
    pub fn new(tools: ToolRegistry) -> Self {
        Self::with_info(ServerInfo::default(), tools)
    }

    pub fn with_info(info: ServerInfo, tools: ToolRegistry) -> Self {
        Self {
            info,
            tools,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Cap the size of a single request line
    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Serve on stdin/stdout until stdin closes
    pub async fn run(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }

    /// Serve requests from `reader`, writing one response line per request to `writer`.
    ///
    /// Returns `Ok(())` on EOF; a failed read or write ends the loop with an error.
    /// Malformed or oversized lines are answered with an error and the loop continues.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = ?self.tools.names(), "MCP server listening");

        let mut buf = Vec::new();
        loop {
            let response = match read_frame(&mut reader, &mut buf, self.max_line_bytes).await? {
                Frame::Eof => {
                    debug!("received EOF, shutting down");
                    break;
                }
                Frame::Oversized => {
                    warn!(limit = self.max_line_bytes, "request line too long, discarded");
                    Some(JsonRpcResponse::error(
                        None,
                        JsonRpcError::invalid_request(format!(
                            "request exceeds {} bytes",
                            self.max_line_bytes
                        )),
                    ))
                }
                Frame::Line => self.handle_bytes(&buf).await,
            };

            let Some(response) = response else {
                continue;
            };

            let encoded = serde_json::to_string(&response)?;
            debug!(response = %encoded, "sending response");

            writer.write_all(encoded.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle one raw request frame, which must be UTF-8.
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Option<JsonRpcResponse> {
        match std::str::from_utf8(bytes) {
            Ok(line) => self.handle_line(line).await,
            Err(e) => {
                warn!(error = %e, "request is not valid UTF-8");
                Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Invalid UTF-8: {}", e)),
                ))
            }
        }
    }

    /// Handle one request line; `None` means nothing should be sent back.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!(request = line, "received request");

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
                ));
            }
        };

        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "malformed request");
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "notification received");
            return None;
        }

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        Some(self.handle_request(request).await)
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request).await,
            _ => {
                JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(&request.method))
            }
        }
    }

    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: InitializeParams = serde_json::from_value(request.params).unwrap_or_default();
        let version = negotiate_protocol_version(params.protocol_version.as_deref());
        debug!(
            requested = ?params.protocol_version,
            negotiated = version,
            "handling initialize"
        );

        JsonRpcResponse::success(
            request.id,
            json!({
                "protocolVersion": version,
                "serverInfo": {
                    "name": self.info.name,
                    "version": self.info.version
                },
                "capabilities": {
                    "tools": {}
                }
            }),
        )
    }

    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<ToolDescriptor> = self.tools.all().into_iter().map(Into::into).collect();
        JsonRpcResponse::success(request.id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(request.params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_params(format!("invalid tools/call params: {}", e)),
                );
            }
        };

        let Some(tool) = self.tools.get(&params.name) else {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_params(format!("Tool {} not found", params.name)),
            );
        };

        debug!(tool = %params.name, "calling tool");

        let output = match tool.execute(params.arguments).await {
            Ok(output) => output,
            Err(e @ ToolError::InvalidArguments { .. }) => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_params(e.to_string()),
                );
            }
            Err(e @ ToolError::Io(_)) => {
                error!(tool = %params.name, error = %e, "tool execution failed");
                ToolOutput::error(e.to_string())
            }
        };

        match serde_json::to_value(CallToolResult::from(output)) {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(e) => JsonRpcResponse::error(
                request.id,
                JsonRpcError::internal_error(format!("failed to encode tool result: {}", e)),
            ),
        }
    }
}

/// Extracts the text of the first content block of a `tools/call` result.
pub fn result_text(result: &Value) -> Option<&str> {
    result["content"][0]["text"].as_str()
}
