//! Error types for MCP operations.

use thiserror::Error;

/// Errors from MCP server communication and session management.
#[derive(Debug, Error)]
pub enum McpError {
    // Configuration
    #[error("Session key must not be empty")]
    InvalidKey,

    #[error("MCP session '{key}' is already connected")]
    AlreadyConnected { key: String },

    #[error("Unsupported transport type '{kind}' (expected \"stdio\" or \"http\")")]
    UnsupportedTransport { kind: String },

    #[error("MCP server '{server}' is missing required field '{field}'")]
    MissingField { server: String, field: &'static str },

    #[error("MCP server '{server}' has an invalid HTTP header '{header}'")]
    InvalidHeader { server: String, header: String },

    #[error("Config file error at {path}: {message}")]
    Config { path: String, message: String },

    // Transport
    #[error("Failed to spawn MCP server '{name}': {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },

    #[error("MCP server '{name}' is not running")]
    ServerNotRunning { name: String },

    #[error("MCP server '{server}' returned HTTP {status}: {body}")]
    Http {
        server: String,
        status: u16,
        body: String,
    },

    #[error("Network error talking to MCP server '{server}': {message}")]
    Network { server: String, message: String },

    #[error("MCP server '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Protocol
    #[error("JSON-RPC error from '{server}' (code {code}): {message}")]
    JsonRpc {
        server: String,
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    // Lookup
    #[error("No MCP session named '{key}'")]
    NotFound { key: String },

    #[error("Failed to close {} MCP session(s): {}", .failures.len(), join_failures(.failures))]
    Disconnect { failures: Vec<(String, McpError)> },
}

fn join_failures(failures: &[(String, McpError)]) -> String {
    failures
        .iter()
        .map(|(key, err)| format!("{key}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl McpError {
    /// The remote JSON-RPC error code, if this is a protocol error reported by the server.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            McpError::JsonRpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}
