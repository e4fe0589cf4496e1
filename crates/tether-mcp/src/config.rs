//! Configuration types for MCP servers.

use crate::error::McpError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Top-level MCP configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: HashMap<String, McpServerConfig>,
}

impl McpConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields an empty configuration; a file that exists but
    /// cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, McpError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No MCP config at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(McpError::Config {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        toml::from_str(&content).map_err(|e| McpError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Configuration for a single MCP server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Transport kind: "stdio" (the default when empty) or "http".
    #[serde(default)]
    pub transport: String,
    /// Command to run (e.g., "npx", "python"). Required for stdio.
    #[serde(default)]
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables to set for the server process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Endpoint URL. Required for http.
    #[serde(default)]
    pub url: String,
    /// Extra HTTP headers (e.g. Authorization) sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Timeout for requests in milliseconds (default: 30000, 0 disables).
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl McpServerConfig {
    /// A stdio server definition.
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            transport: "stdio".to_string(),
            command: command.into(),
            args,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            ..Default::default()
        }
    }

    /// An HTTP server definition.
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            transport: "http".to_string(),
            url: url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            ..Default::default()
        }
    }
}

/// Get the tether config directory path (~/.tether/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TETHER_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tether")
}

/// Default location of the server definitions file.
pub fn default_config_path() -> PathBuf {
    config_dir().join("mcp.toml")
}
