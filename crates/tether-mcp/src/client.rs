//! MCP client — one handshaked connection to one server.
//!
//! Handles the MCP protocol handshake (initialize + initialized notification)
//! and exposes the typed tool, resource and prompt operations.

use crate::config::McpServerConfig;
use crate::error::McpError;
use crate::transport::{Transport, TransportKind};
use crate::types::{
    CallToolResult, Content, GetPromptResult, InitializeResult, Page, Prompt, PromptMessage,
    PromptResultWire, ReadResourceResult, Resource, ResourceContents, ServerInfo, Tool,
    ToolCallResult, flatten_content,
};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

/// MCP protocol version we support.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name we introduce ourselves with during the handshake.
const CLIENT_NAME: &str = "tether";

/// Client for a single MCP server.
///
/// A value of this type has always completed the handshake; [`McpClient::connect`]
/// either returns a ready client or an error.
pub struct McpClient {
    name: String,
    transport: Transport,
    server_info: ServerInfo,
    timeout_ms: u64,
}

impl McpClient {
    /// Connect to an MCP server: open the transport and run the handshake.
    ///
    /// If the handshake fails the transport is closed (for stdio, the spawned
    /// process is killed) before the error is returned.
    pub async fn connect(
        name: impl Into<String>,
        config: &McpServerConfig,
    ) -> Result<Self, McpError> {
        let name = name.into();
        let transport = Transport::open(&name, config)?;

        let server_info = match handshake(&name, &transport, config.timeout_ms).await {
            Ok(info) => info,
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    tracing::warn!(
                        "Failed to close MCP server '{}' after handshake error: {}",
                        name,
                        close_err
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            "MCP server '{}' connected over {} ({} v{})",
            name,
            transport.kind(),
            server_info.name,
            server_info.version
        );

        Ok(Self {
            name,
            transport,
            server_info,
            timeout_ms: config.timeout_ms,
        })
    }

    /// List the tools the server exposes, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, McpError> {
        self.list_paged("tools/list").await
    }

    /// Call a tool on this server.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult, McpError> {
        let arguments = if arguments.is_null() {
            serde_json::json!({})
        } else {
            arguments
        };
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });

        let result = self.request("tools/call", Some(params)).await?;
        let call_result: ToolCallResult = decode(&self.name, "tools/call", result)?;

        Ok(CallToolResult {
            content: flatten_content(call_result.content),
            is_error: call_result.is_error,
        })
    }

    /// List the resources the server exposes, following pagination.
    pub async fn list_resources(&self) -> Result<Vec<Resource>, McpError> {
        self.list_paged("resources/list").await
    }

    /// Read one resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<Content>, McpError> {
        let params = serde_json::json!({ "uri": uri });
        let result = self.request("resources/read", Some(params)).await?;
        let read: ReadResourceResult = decode(&self.name, "resources/read", result)?;

        Ok(read
            .contents
            .into_iter()
            .filter_map(ResourceContents::into_content)
            .collect())
    }

    /// List the prompts the server exposes, following pagination.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>, McpError> {
        self.list_paged("prompts/list").await
    }

    /// Render a prompt with the given arguments.
    pub async fn get_prompt(
        &self,
        prompt_name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<GetPromptResult, McpError> {
        let params = serde_json::json!({
            "name": prompt_name,
            "arguments": arguments,
        });
        let result = self.request("prompts/get", Some(params)).await?;
        let wire: PromptResultWire = decode(&self.name, "prompts/get", result)?;

        let messages = wire
            .messages
            .into_iter()
            .filter_map(|m| {
                let role = m.role;
                m.content
                    .into_content()
                    .map(|content| PromptMessage { role, content })
            })
            .collect();

        Ok(GetPromptResult {
            description: wire.description,
            messages,
        })
    }

    /// Liveness check.
    pub async fn ping(&self) -> Result<(), McpError> {
        self.request("ping", None).await.map(|_| ())
    }

    /// What the server reported during the handshake.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Get the session name this client was registered under.
    pub fn server_name(&self) -> &str {
        &self.name
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Shut down the server connection. Calling it more than once is harmless.
    pub async fn close(&self) -> Result<(), McpError> {
        self.transport.close().await
    }

    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        rpc(&self.name, &self.transport, self.timeout_ms, method, params).await
    }

    async fn list_paged<T: DeserializeOwned>(&self, method: &str) -> Result<Vec<T>, McpError> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor
                .as_ref()
                .map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request(method, params).await?;
            let page: Page<T> = decode(&self.name, method, result)?;
            items.extend(page.items);

            match page.next_cursor {
                Some(next) if next.is_empty() => break,
                Some(next) if !seen.insert(next.clone()) => {
                    tracing::warn!(
                        "MCP server '{}' repeated cursor '{}' for {}; stopping",
                        self.name,
                        next,
                        method
                    );
                    break;
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(items)
    }
}

/// Run `initialize`, record the server's answer, then send `initialized`.
async fn handshake(
    name: &str,
    transport: &Transport,
    timeout_ms: u64,
) -> Result<ServerInfo, McpError> {
    let init_params = serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "roots": { "listChanged": false }
        },
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    });

    let result = rpc(name, transport, timeout_ms, "initialize", Some(init_params)).await?;
    let init: InitializeResult = decode(name, "initialize", result)?;
    if init.protocol_version != PROTOCOL_VERSION {
        tracing::debug!(
            "MCP server '{}' negotiated protocol {} (we asked for {})",
            name,
            init.protocol_version,
            PROTOCOL_VERSION
        );
    }

    bounded(
        name,
        timeout_ms,
        transport.notify("notifications/initialized", None),
    )
    .await?;

    Ok(init.into())
}

/// One request/response exchange, reduced to the result value.
async fn rpc(
    name: &str,
    transport: &Transport,
    timeout_ms: u64,
    method: &str,
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, McpError> {
    let resp = bounded(name, timeout_ms, transport.call(method, params)).await?;
    resp.into_result(name)
}

/// Apply the per-request timeout; `0` waits forever.
async fn bounded<T>(
    name: &str,
    timeout_ms: u64,
    fut: impl Future<Output = Result<T, McpError>>,
) -> Result<T, McpError> {
    if timeout_ms == 0 {
        return fut.await;
    }
    tokio::time::timeout(Duration::from_millis(timeout_ms), fut)
        .await
        .map_err(|_| McpError::Timeout {
            name: name.to_string(),
            timeout_ms,
        })?
}

/// Parse a result value; a `null` result counts as an empty object.
fn decode<T: DeserializeOwned>(
    server: &str,
    method: &str,
    result: serde_json::Value,
) -> Result<T, McpError> {
    let result = if result.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        result
    };
    serde_json::from_value(result).map_err(|e| {
        McpError::Protocol(format!("Failed to parse {method} response from '{server}': {e}"))
    })
}
