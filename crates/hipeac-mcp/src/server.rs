//! MCP server implementation.
//!
//! Dispatches JSON-RPC requests to the tool executor and the metadata
//! resources, over stdio or HTTP.

use crate::error::{McpError, codes};
use crate::executor::ToolExecutor;
use crate::http_transport::HttpServer;
use crate::protocol::*;
use crate::resources;
use crate::tools::ToolRegistry;
use hipeac_core::{McpConfig, Transport};
use hipeac_directory::Directory;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// The MCP server. Cheap to clone; clones share the directory.
#[derive(Clone)]
pub struct McpServer {
    config: McpConfig,
    tools: ToolRegistry,
    executor: ToolExecutor,
}

impl McpServer {
    /// Create a server exposing the directory tools and resources.
    pub fn new(config: McpConfig, directory: Arc<Directory>) -> Self {
        Self {
            config,
            tools: ToolRegistry::with_directory_tools(),
            executor: ToolExecutor::new(directory),
        }
    }

    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Start the MCP server.
    pub async fn run(&self) -> Result<(), McpError> {
        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    /// Run the server with stdio transport: one JSON-RPC message per line.
    async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!("Starting MCP server with stdio transport");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding malformed JSON-RPC message");
                    Some(JsonRpcResponse::error(
                        None,
                        codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let mut payload = serde_json::to_vec(&response)?;
                payload.push(b'\n');
                stdout.write_all(&payload).await?;
                stdout.flush().await?;
            }
        }

        tracing::info!("stdin closed, stopping MCP server");
        Ok(())
    }

    /// Run the server with HTTP transport.
    pub async fn run_http(&self) -> Result<(), McpError> {
        tracing::info!(
            address = %self.config.bind_address(),
            "Starting MCP server with HTTP transport"
        );
        HttpServer::new(self.config.bind_address(), self.clone())
            .run()
            .await
    }

    /// Handle a JSON-RPC message. Notifications yield no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.id.clone();
        if request.jsonrpc != JSONRPC_VERSION {
            let e = McpError::InvalidRequest(format!(
                "unsupported jsonrpc version '{}'",
                request.jsonrpc
            ));
            tracing::warn!(method = %request.method, error = %e, "Rejected request");
            return Some(JsonRpcResponse::error(id, e.code(), e.to_string()));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            "resources/list" => to_result(ListResourcesResponse {
                resources: resources::list_resources(),
            }),
            "resources/read" => self.handle_read_resource(request.params).await,
            "shutdown" => Ok(self.handle_shutdown()),
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                tracing::warn!(method = %request.method, error = %e, "Request failed");
                JsonRpcResponse::error(id, e.code(), e.to_string())
            }
        })
    }

    fn handle_initialize(&self) -> Result<Value, McpError> {
        let server_info = serde_json::to_value(ServerInfo {
            name: "hipeac-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })?;
        Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": server_info,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            }
        }))
    }

    fn handle_list_tools(&self) -> Result<Value, McpError> {
        to_result(ListToolsResponse {
            tools: self.tools.list().into_iter().cloned().collect(),
        })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: CallToolParams = parse_params(params)?;

        if !self.tools.contains(&params.name) {
            return Err(McpError::ToolNotFound { name: params.name });
        }

        let response = self.executor.execute(&params.name, params.arguments).await?;
        Ok(serde_json::to_value(response)?)
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ReadResourceParams = parse_params(params)?;
        let contents = resources::read_resource(self.executor.directory(), &params.uri).await?;
        to_result(ReadResourceResponse {
            contents: vec![contents],
        })
    }

    fn handle_shutdown(&self) -> Value {
        tracing::info!("MCP server shutdown requested");
        Value::Null
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, McpError> {
    Ok(serde_json::to_value(value)?)
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, McpError> {
    let params = params.ok_or_else(|| McpError::InvalidArguments {
        tool: "-".to_string(),
        reason: "missing params".to_string(),
    })?;
    serde_json::from_value(params).map_err(|e| McpError::InvalidArguments {
        tool: "-".to_string(),
        reason: format!("invalid params: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hipeac_core::DirectoryConfig;
    use hipeac_directory::memory::InMemoryDirectory;

    fn server() -> McpServer {
        let store = Arc::new(InMemoryDirectory::new());
        let directory = Directory::new(store, DirectoryConfig::default());
        McpServer::new(McpConfig::default(), Arc::new(directory))
    }

    async fn call(server: &McpServer, method: &str, params: Option<Value>) -> JsonRpcResponse {
        server
            .handle_request(JsonRpcRequest::new(1, method, params))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(&server(), "initialize", None).await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "hipeac-mcp");
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(server().handle_request(request).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = call(&server(), "prompts/list", None).await;
        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_call_nonexistent_tool() {
        let response = call(
            &server(),
            "tools/call",
            Some(json!({"name": "nonexistent", "arguments": {}})),
        )
        .await;
        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_call_tool_without_params() {
        let response = call(&server(), "tools/call", None).await;
        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version_is_invalid_request() {
        let request = JsonRpcRequest {
            jsonrpc: "1.0".to_string(),
            ..JsonRpcRequest::new(3, "ping", None)
        };
        let response = server().handle_request(request).await.unwrap();

        assert_eq!(response.id, Some(json!(3)));
        assert_eq!(response.error.unwrap().code, codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_ping() {
        let response = call(&server(), "ping", None).await;
        assert_eq!(response.result, Some(json!({})));
    }
}
