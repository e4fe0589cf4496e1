//! Transport selection and dispatch.
//!
//! A connection talks to its server over exactly one transport. Both
//! implementations serialize every request behind a single lock held for the
//! full round trip, so at most one request is in flight per connection.

use crate::config::McpServerConfig;
use crate::error::McpError;
use crate::http::HttpTransport;
use crate::jsonrpc::JsonRpcResponse;
use crate::stdio::StdioTransport;
use std::fmt;
use std::str::FromStr;

/// The wire a connection runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Http,
}

impl FromStr for TransportKind {
    type Err = McpError;

    /// An empty string selects stdio.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "stdio" => Ok(TransportKind::Stdio),
            "http" => Ok(TransportKind::Http),
            other => Err(McpError::UnsupportedTransport {
                kind: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stdio => f.write_str("stdio"),
            TransportKind::Http => f.write_str("http"),
        }
    }
}

/// One request/response channel to an MCP server.
pub(crate) enum Transport {
    Stdio(StdioTransport),
    Http(HttpTransport),
}

impl Transport {
    /// Build the transport described by `config`. For stdio this spawns the
    /// server process; for HTTP nothing is sent until the first call.
    pub(crate) fn open(name: &str, config: &McpServerConfig) -> Result<Self, McpError> {
        match config.transport.parse::<TransportKind>()? {
            TransportKind::Stdio => {
                if config.command.is_empty() {
                    return Err(McpError::MissingField {
                        server: name.to_string(),
                        field: "command",
                    });
                }
                StdioTransport::spawn(name, &config.command, &config.args, &config.env)
                    .map(Transport::Stdio)
            }
            TransportKind::Http => {
                if config.url.is_empty() {
                    return Err(McpError::MissingField {
                        server: name.to_string(),
                        field: "url",
                    });
                }
                HttpTransport::new(name, &config.url, &config.headers).map(Transport::Http)
            }
        }
    }

    pub(crate) fn kind(&self) -> TransportKind {
        match self {
            Transport::Stdio(_) => TransportKind::Stdio,
            Transport::Http(_) => TransportKind::Http,
        }
    }

    /// Send a request and wait for its matching response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        match self {
            Transport::Stdio(t) => t.send_request(method, params).await,
            Transport::Http(t) => t.send_request(method, params).await,
        }
    }

    /// Send a notification without waiting for a reply.
    pub(crate) async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        match self {
            Transport::Stdio(t) => t.send_notification(method, params).await,
            Transport::Http(t) => t.send_notification(method, params).await,
        }
    }

    /// Release the transport. Safe to call more than once.
    pub(crate) async fn close(&self) -> Result<(), McpError> {
        match self {
            Transport::Stdio(t) => t.shutdown().await,
            Transport::Http(_) => Ok(()),
        }
    }
}
