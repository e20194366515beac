//! Stream transport: JSON-RPC 2.0 (MCP) over stdio.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;

use crate::error::{codes, Result};
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcId, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, McpMessage, ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability,
};
use crate::tools::ToolRegistry;

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name.
pub const SERVER_NAME: &str = "pagebridge-mcp";

/// Server version.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialization.
    Uninitialized,
    /// Server is initialized and ready.
    Ready,
    /// Server is shutting down.
    ShuttingDown,
}

/// MCP server speaking JSON-RPC over stdio.
pub struct McpServer {
    state: Arc<RwLock<ServerState>>,
    tools: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new server over the given tool registry.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ServerState::Uninitialized)),
            tools,
        }
    }

    /// Run the server on stdio: one JSON-RPC message per line, replies
    /// emitted in order on stdout. Logging goes to stderr only.
    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        tracing::info!("MCP server starting on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }

            tracing::debug!("received: {}", line);

            if let Some(response) = self.handle_message(&line).await {
                let json = serde_json::to_string(&response)?;
                tracing::debug!("sending: {}", json);
                stdout.write_all(json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }

            if *self.state.read().await == ServerState::ShuttingDown {
                break;
            }
        }

        tracing::info!("MCP server shutting down");
        Ok(())
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_message(&self, json: &str) -> Option<JsonRpcResponse> {
        match McpMessage::parse(json) {
            Ok(McpMessage::Request(request)) => Some(self.handle_request(request).await),
            Ok(McpMessage::Notification(notification)) => {
                self.handle_notification(notification).await;
                None
            }
            Err(e) => Some(JsonRpcResponse::error(
                None,
                codes::PARSE_ERROR,
                e.to_string(),
            )),
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params).await,
            "tools/list" => self.handle_tools_list(id).await,
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "shutdown" => {
                *self.state.write().await = ServerState::ShuttingDown;
                JsonRpcResponse::success(id, serde_json::json!({}))
            }
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("method not found: {}", request.method),
            ),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcRequest) {
        match notification.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("request cancelled by client");
            }
            "exit" => {
                *self.state.write().await = ServerState::ShuttingDown;
            }
            _ => {
                tracing::debug!("unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(
        &self,
        id: Option<JsonRpcId>,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let _params: InitializeParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("invalid initialize params: {e}"),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    "initialize params required",
                );
            }
        };

        *self.state.write().await = ServerState::Ready;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.into(),
                version: SERVER_VERSION.into(),
            },
        };

        JsonRpcResponse::success(id, result)
    }

    async fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        if *self.state.read().await != ServerState::Ready {
            return JsonRpcResponse::error(id, codes::INTERNAL_ERROR, "server not initialized");
        }

        let result = ListToolsResult {
            tools: self.tools.list_tools(),
        };
        JsonRpcResponse::success(id, result)
    }

    async fn handle_tools_call(
        &self,
        id: Option<JsonRpcId>,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        if *self.state.read().await != ServerState::Ready {
            return JsonRpcResponse::error(id, codes::INTERNAL_ERROR, "server not initialized");
        }

        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("invalid tool call params: {e}"),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "tool call params required");
            }
        };

        // Tool failures are data: the envelope rides in a successful
        // JSON-RPC response, never a protocol-level error.
        let result = self.tools.execute(&params.name, params.arguments).await;
        JsonRpcResponse::success(id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use serde_json::json;

    fn server() -> McpServer {
        McpServer::new(Arc::new(ToolRegistry::new(Arc::new(Session::new(true)))))
    }

    async fn initialize(server: &McpServer) {
        let msg = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.0"}
            }
        });
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let server = server();
        let msg = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.0"}
            }
        });
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_requires_initialization() {
        let server = server();
        let msg = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, codes::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn tools_list_returns_catalog() {
        let server = server();
        initialize(&server).await;

        let msg = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 30);
        let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
        assert!(names.contains(&"navigate"));
        assert!(names.contains(&"screenshot"));
        assert!(names.contains(&"set_viewport"));
    }

    #[tokio::test]
    async fn unknown_method_is_json_rpc_error() {
        let server = server();
        let msg = json!({"jsonrpc": "2.0", "id": 9, "method": "nonexistent/method"});
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn parse_error_yields_null_id_response() {
        let server = server();
        let response = server.handle_message("this is not json").await.unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.error.unwrap().code, codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn unknown_tool_rides_in_successful_response() {
        let server = server();
        initialize(&server).await;

        let msg = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "does-not-exist", "arguments": {}}
        });
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Unknown tool: does-not-exist");
    }

    #[tokio::test]
    async fn missing_required_argument_rides_in_successful_response() {
        let server = server();
        initialize(&server).await;

        let msg = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "navigate", "arguments": {}}
        });
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "missing required argument: url");
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let server = server();
        let msg = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server.handle_message(&msg.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn shutdown_transitions_state() {
        let server = server();
        initialize(&server).await;

        let msg = json!({"jsonrpc": "2.0", "id": 5, "method": "shutdown"});
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        assert!(response.error.is_none());

        // Requests after shutdown are no longer serviced as Ready.
        let msg = json!({"jsonrpc": "2.0", "id": 6, "method": "tools/list"});
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn ping_always_succeeds() {
        let server = server();
        let msg = json!({"jsonrpc": "2.0", "id": 7, "method": "ping"});
        let response = server.handle_message(&msg.to_string()).await.unwrap();
        assert!(response.error.is_none());
    }
}
