//! HTTP transport for MCP server communication.
//!
//! Each request is one POST of a JSON-RPC body to a fixed endpoint, answered
//! by one JSON-RPC body. The session id issued by the server (if any) is
//! echoed back on every later request.

use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Header carrying the server-assigned session id.
const SESSION_HEADER: &str = "mcp-session-id";

/// Upper bound on how much of an error body ends up in an error message.
const MAX_ERROR_BODY: usize = 200;

/// HTTP transport for one MCP endpoint.
pub struct HttpTransport {
    name: String,
    url: String,
    http: reqwest::Client,
    headers: HeaderMap,
    state: Mutex<HttpState>,
}

struct HttpState {
    next_id: u64,
    session_id: Option<String>,
}

impl HttpTransport {
    /// Create a transport for `url`. No request is sent until the first call.
    pub fn new(
        name: &str,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Self, McpError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in headers {
            let invalid = || McpError::InvalidHeader {
                server: name.to_string(),
                header: key.clone(),
            };
            let header_name: HeaderName = key.parse().map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            header_map.insert(header_name, header_value);
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| McpError::Network {
                server: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            http,
            headers: header_map,
            state: Mutex::new(HttpState {
                next_id: 1,
                session_id: None,
            }),
        })
    }

    /// POST a JSON-RPC request and decode the response body.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;

        let body = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        tracing::debug!("MCP '{}' -> {} (id={}) POST {}", self.name, method, id, self.url);

        let response = self.post(&mut state, body).await?;
        let text = response.text().await.map_err(|e| self.network(e))?;

        let resp: JsonRpcResponse = serde_json::from_str(&text).map_err(|e| {
            McpError::Protocol(format!("Malformed response from '{}': {e}", self.name))
        })?;
        match resp.id {
            Some(got) if got != id => Err(McpError::Protocol(format!(
                "MCP server '{}' answered id {got} to request id {id}",
                self.name
            ))),
            _ => Ok(resp),
        }
    }

    /// POST a JSON-RPC notification; only the HTTP status is checked.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let mut state = self.state.lock().await;
        let body = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        tracing::debug!("MCP '{}' -> {} (notification)", self.name, method);

        self.post(&mut state, body).await.map(|_| ())
    }

    /// Send one body, record any session id, and reject non-2xx statuses.
    async fn post(
        &self,
        state: &mut HttpState,
        body: String,
    ) -> Result<reqwest::Response, McpError> {
        let mut req = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .headers(self.headers.clone())
            .body(body);
        if let Some(sid) = &state.session_id {
            req = req.header(SESSION_HEADER, sid.as_str());
        }

        let response = req.send().await.map_err(|e| self.network(e))?;

        if let Some(sid) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if state.session_id.as_deref() != Some(sid) {
                tracing::debug!("MCP '{}' session id: {}", self.name, sid);
                state.session_id = Some(sid.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Http {
                server: self.name.clone(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        Ok(response)
    }

    fn network(&self, err: reqwest::Error) -> McpError {
        McpError::Network {
            server: self.name.clone(),
            message: err.to_string(),
        }
    }
}
