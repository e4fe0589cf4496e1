//! MCP registry — a directory of live connections keyed by session name.
//!
//! Structural changes (connect, disconnect) take the write lock; lookups take
//! the read lock. `connect` holds the write lock across process spawn and the
//! whole handshake, so two connects never race on the same key.

use crate::client::McpClient;
use crate::config::{McpConfig, McpServerConfig};
use crate::error::McpError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Manages connections to multiple MCP servers.
#[derive(Default)]
pub struct McpRegistry {
    clients: RwLock<HashMap<String, Arc<McpClient>>>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new session under `key`.
    ///
    /// Fails without touching the registry if the key is empty or already in
    /// use, the transport kind is unsupported, or the server cannot be started
    /// and handshaked.
    pub async fn connect(
        &self,
        key: &str,
        config: &McpServerConfig,
    ) -> Result<Arc<McpClient>, McpError> {
        if key.is_empty() {
            return Err(McpError::InvalidKey);
        }

        let mut clients = self.clients.write().await;
        if clients.contains_key(key) {
            return Err(McpError::AlreadyConnected {
                key: key.to_string(),
            });
        }

        let client = Arc::new(McpClient::connect(key, config).await?);
        clients.insert(key.to_string(), Arc::clone(&client));
        Ok(client)
    }

    /// Connect every server in `config`.
    ///
    /// Servers that fail to start are logged and skipped; the failures are
    /// returned so callers can report them.
    pub async fn connect_all(&self, config: &McpConfig) -> Vec<(String, McpError)> {
        let mut names: Vec<&String> = config.servers.keys().collect();
        names.sort();

        let mut failures = Vec::new();
        for name in names {
            let server_config = &config.servers[name];
            match self.connect(name, server_config).await {
                Ok(client) => {
                    tracing::info!(
                        "MCP server '{}' started ({} v{})",
                        name,
                        client.server_info().name,
                        client.server_info().version
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to start MCP server '{}': {}", name, e);
                    failures.push((name.clone(), e));
                }
            }
        }
        failures
    }

    /// Look up the client registered under `key`.
    pub async fn get_client(&self, key: &str) -> Result<Arc<McpClient>, McpError> {
        self.clients
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| McpError::NotFound {
                key: key.to_string(),
            })
    }

    /// Remove `key` and close its connection.
    ///
    /// The entry is gone afterwards even when closing fails.
    pub async fn disconnect(&self, key: &str) -> Result<(), McpError> {
        let client = self
            .clients
            .write()
            .await
            .remove(key)
            .ok_or_else(|| McpError::NotFound {
                key: key.to_string(),
            })?;

        tracing::info!("Disconnecting MCP server '{}'", key);
        client.close().await
    }

    /// Close every connection and empty the registry.
    ///
    /// Every connection is attempted; all close failures are reported together.
    pub async fn disconnect_all(&self) -> Result<(), McpError> {
        let drained: Vec<(String, Arc<McpClient>)> =
            self.clients.write().await.drain().collect();

        let mut failures = Vec::new();
        for (key, client) in drained {
            if let Err(e) = client.close().await {
                tracing::warn!("Failed to close MCP server '{}': {}", key, e);
                failures.push((key, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(McpError::Disconnect { failures })
        }
    }

    /// Snapshot of the connected session keys, sorted.
    pub async fn list_connections(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.clients.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of connected servers.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}
