//! Descriptions and payloads returned by MCP servers.
//!
//! Wire shapes (`*Wire`, `*Result`) are private to the crate; callers only see
//! the flattened domain types.

use serde::{Deserialize, Serialize};

/// Information about a tool exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema", rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// A resource the server can read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// A prompt template the server can render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// One named argument of a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a rendered prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Content,
}

/// A rendered prompt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Result of calling a tool on an MCP server.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
}

/// A payload item from a tool call, resource read, or prompt message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Content {
    Text {
        text: String,
    },
    /// Base64-encoded bytes.
    Binary {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl Content {
    /// "text" or "binary".
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text { .. } => "text",
            Content::Binary { .. } => "binary",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            Content::Binary { .. } => None,
        }
    }
}

/// What the server reported about itself during the handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub protocol_version: String,
    pub capabilities: serde_json::Value,
    pub name: String,
    pub version: String,
}

// --- wire shapes -----------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    pub server_info: Implementation,
}

#[derive(Deserialize)]
pub(crate) struct Implementation {
    pub name: String,
    pub version: String,
}

impl From<InitializeResult> for ServerInfo {
    fn from(init: InitializeResult) -> Self {
        ServerInfo {
            protocol_version: init.protocol_version,
            capabilities: init.capabilities,
            name: init.server_info.name,
            version: init.server_info.version,
        }
    }
}

/// One page of a paginated list result.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new", alias = "tools", alias = "resources", alias = "prompts")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentWire>,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Deserialize)]
pub(crate) struct ReadResourceResult {
    #[serde(default)]
    pub contents: Vec<ResourceContents>,
}

#[derive(Deserialize)]
pub(crate) struct PromptResultWire {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub messages: Vec<PromptMessageWire>,
}

#[derive(Deserialize)]
pub(crate) struct PromptMessageWire {
    pub role: Role,
    pub content: ContentWire,
}

/// A content item as servers send it.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(crate) enum ContentWire {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: ResourceContents,
    },
    #[serde(other)]
    Unsupported,
}

/// Body of a `resources/read` entry or an embedded resource.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceContents {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub blob: Option<String>,
}

impl ContentWire {
    /// Flatten into domain content; `None` for types we do not model.
    pub(crate) fn into_content(self) -> Option<Content> {
        match self {
            ContentWire::Text { text } => Some(Content::Text { text }),
            ContentWire::Image { data, mime_type } | ContentWire::Audio { data, mime_type } => {
                Some(Content::Binary { data, mime_type })
            }
            ContentWire::Resource { resource } => resource.into_content(),
            ContentWire::Unsupported => None,
        }
    }
}

impl ResourceContents {
    pub(crate) fn into_content(self) -> Option<Content> {
        match (self.text, self.blob) {
            (Some(text), _) => Some(Content::Text { text }),
            (None, Some(data)) => Some(Content::Binary {
                data,
                mime_type: self
                    .mime_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            }),
            (None, None) => {
                tracing::debug!("Resource '{}' has neither text nor blob", self.uri);
                None
            }
        }
    }
}

/// Convert wire items, dropping any the domain model cannot represent.
pub(crate) fn flatten_content(items: Vec<ContentWire>) -> Vec<Content> {
    items
        .into_iter()
        .filter_map(ContentWire::into_content)
        .collect()
}
