//! MCP (Model Context Protocol) client engine.
//!
//! Speaks JSON-RPC 2.0 to MCP servers either over a child process's stdio
//! (newline-delimited messages) or over HTTP POST. Each connection is
//! handshaked before it becomes visible, and a [`McpRegistry`] keeps live
//! connections addressable by a caller-chosen session key.

pub mod client;
pub mod config;
pub mod error;
mod http;
pub mod jsonrpc;
pub mod registry;
mod stdio;
mod transport;
pub mod types;

pub use client::{McpClient, PROTOCOL_VERSION};
pub use config::{McpConfig, McpServerConfig};
pub use error::McpError;
pub use registry::McpRegistry;
pub use transport::TransportKind;
pub use types::{
    CallToolResult, Content, GetPromptResult, Prompt, PromptArgument, PromptMessage, Resource,
    Role, ServerInfo, Tool,
};
