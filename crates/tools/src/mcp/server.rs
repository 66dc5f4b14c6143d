//! MCP server over newline-delimited JSON-RPC 2.0.

use rapidapi_core::{Error, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use super::jsonrpc::*;
use crate::{ToolContext, ToolRegistry};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "rapidapi-mcp";

pub struct McpServer {
    registry: ToolRegistry,
    ctx: ToolContext,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, ctx: ToolContext) -> Self {
        Self { registry, ctx }
    }

    /// Read requests line by line until EOF, answering each in order.
    /// The browser is closed before returning.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("MCP server listening on stdio");
        let mut buf = Vec::new();
        let outcome = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    info!("stdin closed, shutting down");
                    break Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Failed to read from stdin");
                    break Err(Error::Io(e));
                }
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim_end_matches(['\n', '\r']);
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_message(line).await
                }
                Err(e) => {
                    warn!(error = %e, "Message is not valid UTF-8");
                    Some(
                        JsonRpcResponse::failure(
                            Value::Null,
                            PARSE_ERROR,
                            format!("Parse error: invalid UTF-8 ({})", e),
                        )
                        .into_value(),
                    )
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                if let Err(e) = write_line(&mut writer, &out).await {
                    error!(error = %e, "Failed to write response");
                    break Err(Error::Io(e));
                }
            }
        };

        self.ctx.sessions.close_all().await;
        outcome
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub async fn handle_message(&self, line: &str) -> Option<Value> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparsable JSON-RPC message");
                return Some(
                    JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))
                        .into_value(),
                );
            }
        };

        let id_hint = raw.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                return Some(
                    JsonRpcResponse::failure(id_hint, INVALID_REQUEST, format!("Invalid request: {}", e))
                        .into_value(),
                );
            }
        };
        if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
            return Some(
                JsonRpcResponse::failure(id_hint, INVALID_REQUEST, "Unsupported jsonrpc version")
                    .into_value(),
            );
        }

        debug!(method = %request.method, "MCP request");
        if request.is_notification() {
            self.handle_notification(&request);
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        let response = match self.dispatch(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::failure(id, code, message),
        };
        Some(response.into_value())
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => debug!("Cancellation ignored; calls run to completion"),
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> std::result::Result<Value, (i64, String)> {
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({"tools": self.registry.get_tool_schemas()})),
            "tools/call" => self.call_tool(request.params.as_ref()).await,
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        }
    }

    async fn call_tool(&self, params: Option<&Value>) -> std::result::Result<Value, (i64, String)> {
        let name = params
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .ok_or((INVALID_PARAMS, "Missing tool name".to_string()))?;
        let arguments = match params.and_then(|p| p.get("arguments")) {
            None | Some(Value::Null) => json!({}),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => return Err((INVALID_PARAMS, "Tool arguments must be an object".to_string())),
        };

        info!(tool = name, "Tool call");
        match self.registry.execute(name, self.ctx.clone(), arguments).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result)
                    .map_err(|e| (INTERNAL_ERROR, e.to_string()))?;
                Ok(tool_result(text, false))
            }
            Err(e) if e.is_caller_error() => {
                warn!(tool = name, error = %e, "Rejected tool call");
                Err((INVALID_PARAMS, e.to_string()))
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                Ok(tool_result(e.to_string(), true))
            }
        }
    }
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error
    })
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
