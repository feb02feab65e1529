//! MCP server implementation.
//!
//! This module provides the MCP server that exposes a finalized
//! [`EnrichApp`] to agents over stdio or HTTP.

use crate::app::EnrichApp;
use crate::error::{EnrichError, McpError};
use crate::http_transport::HttpServer;
use crate::inlining::InlineOptions;
use crate::protocol::*;
use enrich_core::config::{McpConfig, Transport};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

/// The MCP server.
#[derive(Clone)]
pub struct McpServer {
    app: Arc<EnrichApp>,
    config: McpConfig,
    inlining: InlineOptions,
}

impl McpServer {
    /// Create a new MCP server for `app`.
    pub fn new(app: Arc<EnrichApp>, config: McpConfig) -> Self {
        Self {
            app,
            config,
            inlining: InlineOptions {
                max_depth: 1,
                only_inline: true,
            },
        }
    }

    /// Set how retriever results are inlined.
    pub fn with_inlining(mut self, inlining: impl Into<InlineOptions>) -> Self {
        self.inlining = inlining.into();
        self
    }

    pub fn app(&self) -> &Arc<EnrichApp> {
        &self.app
    }

    /// Start the MCP server.
    ///
    /// Fails before opening the transport when the app has not been
    /// finalized.
    pub async fn run(&self) -> Result<(), McpError> {
        if !self.app.is_finalized() {
            return Err(McpError::StartupFailed(
                "application must be finalized before serving".to_string(),
            ));
        }

        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    /// Run the server with stdio transport.
    async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!(title = %self.app.title(), "Starting MCP server with stdio transport");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) if request.is_notification() => {
                    self.handle_request(request).await;
                    continue;
                }
                Ok(request) => self.handle_request(request).await,
                Err(e) => JsonRpcResponse::error(
                    None,
                    codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ),
            };

            let mut response_json = serde_json::to_string(&response)?;
            response_json.push('\n');
            stdout.write_all(response_json.as_bytes()).await?;
            stdout.flush().await?;
        }

        Ok(())
    }

    /// Run the server with HTTP transport.
    pub async fn run_http(&self) -> Result<(), McpError> {
        let address = self.config.address();
        tracing::info!(
            address = %address,
            title = %self.app.title(),
            "Starting MCP server with HTTP transport"
        );

        let (request_tx, mut request_rx) =
            mpsc::channel::<(JsonRpcRequest, mpsc::Sender<JsonRpcResponse>)>(100);

        let server = self.clone();
        tokio::spawn(async move {
            while let Some((request, response_tx)) = request_rx.recv().await {
                let response = server.handle_request(request).await;
                let _ = response_tx.send(response).await;
            }
        });

        let http_server = HttpServer::new(address, self.app.title(), request_tx);
        http_server.run().await
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        tracing::debug!(method = %request.method, "Handling request");

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" => JsonRpcResponse::success(id, json!({})),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": ServerInfo {
                name: self.app.title().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "instructions": self.app.instructions()
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ListToolsResponse {
            tools: self.app.list_tools().into_iter().cloned().collect(),
        };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        codes::INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    );
                }
            },
            None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing params"),
        };

        if !self.app.tools().contains(&params.name) {
            return JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Tool not found: {}", params.name),
            );
        }

        let call_id = Uuid::new_v4();
        let span = tracing::info_span!("tool_call", %call_id, tool = %params.name);
        let result = self
            .app
            .call_tool_inlined(&params.name, params.arguments, self.inlining)
            .instrument(span)
            .await;

        let response = match result {
            Ok(value) => {
                tracing::debug!(%call_id, tool = %params.name, "Tool call succeeded");
                CallToolResponse::json(&value.to_json())
            }
            Err(e) => {
                if let Some(EnrichError::InvalidArguments { .. }) = e.downcast_ref::<EnrichError>() {
                    return JsonRpcResponse::error(id, codes::INVALID_PARAMS, e.to_string());
                }
                tracing::warn!(%call_id, tool = %params.name, error = %e, "Tool call failed");
                CallToolResponse::failure(format!("{:#}", e))
            }
        };

        match serde_json::to_value(response) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }
}
