//! Stdio transport for MCP server communication.
//!
//! Spawns a child process and exchanges newline-delimited JSON-RPC messages
//! over its stdin/stdout. Replies are read on the caller's task while the
//! transport lock is held; there is no background reader, so each request is
//! answered before the next one is written. The server's stderr is drained
//! into `tracing` at debug level so a chatty server never blocks on it.

use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Stdio transport for communicating with an MCP server process.
pub struct StdioTransport {
    name: String,
    pipes: Mutex<Option<StdioPipes>>,
    /// Set by `shutdown`; a pending round trip gives up when it flips.
    closed: watch::Sender<bool>,
}

/// Everything owned by a running server process. `None` once shut down.
struct StdioPipes {
    next_id: u64,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<()>>,
    child: Child,
}

impl StdioTransport {
    /// Spawn a child process with piped stdin/stdout/stderr.
    pub fn spawn(
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::SpawnFailed {
            name: command.to_string(),
            source: e,
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(McpError::Protocol(format!(
                "MCP server '{name}' started without piped stdio"
            )));
        };
        let stderr = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(drain_stderr(name.to_string(), stderr)));

        tracing::debug!("Spawned MCP server '{}' (pid {:?})", name, child.id());
        let (closed, _) = watch::channel(false);

        Ok(Self {
            name: name.to_string(),
            pipes: Mutex::new(Some(StdioPipes {
                next_id: 1,
                stdin,
                stdout: BufReader::new(stdout),
                stderr,
                child,
            })),
            closed,
        })
    }

    /// Send a JSON-RPC request and wait for the response.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let mut closed = self.closed.subscribe();
        let mut guard = self.pipes.lock().await;
        let pipes = guard.as_mut().ok_or_else(|| McpError::ServerNotRunning {
            name: self.name.clone(),
        })?;

        let id = pipes.next_id;
        pipes.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        let serialized = serde_json::to_string(&request)?;
        tracing::debug!("MCP '{}' -> {} (id={})", self.name, method, id);

        let round_trip = async {
            pipes.write_line(&serialized).await?;
            pipes.read_response(&self.name, id).await
        };
        tokio::select! {
            result = round_trip => result,
            _ = closed.wait_for(|closed| *closed) => {
                tracing::debug!("MCP '{}' closed while id {} was pending", self.name, id);
                Err(McpError::ServerNotRunning {
                    name: self.name.clone(),
                })
            }
        }
    }

    /// Send a JSON-RPC notification (fire-and-forget, no response expected).
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let mut closed = self.closed.subscribe();
        let mut guard = self.pipes.lock().await;
        let pipes = guard.as_mut().ok_or_else(|| McpError::ServerNotRunning {
            name: self.name.clone(),
        })?;

        let notification = JsonRpcNotification::new(method, params);
        let serialized = serde_json::to_string(&notification)?;
        tracing::debug!("MCP '{}' -> {} (notification)", self.name, method);

        tokio::select! {
            result = pipes.write_line(&serialized) => result,
            _ = closed.wait_for(|closed| *closed) => Err(McpError::ServerNotRunning {
                name: self.name.clone(),
            }),
        }
    }

    /// Shut down the transport: close stdin, stdout and stderr, kill the
    /// child, then reap it.
    ///
    /// A call waiting on the server is abandoned with `ServerNotRunning`
    /// first, so shutdown never queues behind it. Every step runs even when
    /// an earlier one fails; the first failure is returned. Calling this
    /// again after it has run is a no-op.
    pub async fn shutdown(&self) -> Result<(), McpError> {
        self.closed.send_replace(true);
        let Some(pipes) = self.pipes.lock().await.take() else {
            return Ok(());
        };
        let StdioPipes {
            mut stdin,
            stdout,
            stderr,
            mut child,
            ..
        } = pipes;

        let mut failures: Vec<std::io::Error> = Vec::new();

        if let Err(e) = stdin.shutdown().await {
            failures.push(e);
        }
        drop(stdin);
        drop(stdout);
        if let Some(drain) = stderr {
            drain.abort();
        }

        if let Err(e) = child.start_kill() {
            failures.push(e);
        }
        match child.wait().await {
            Ok(status) => tracing::debug!("MCP server '{}' exited with {}", self.name, status),
            Err(e) => failures.push(e),
        }

        let mut failures = failures.into_iter();
        match failures.next() {
            None => Ok(()),
            Some(first) => {
                for rest in failures {
                    tracing::warn!("Additional error closing MCP server '{}': {}", self.name, rest);
                }
                Err(McpError::Io(first))
            }
        }
    }
}

/// Forward the server's stderr to the log, line by line, until it closes.
async fn drain_stderr(name: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::debug!("MCP '{}' stderr: {}", name, line),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped reading stderr of MCP server '{}': {}", name, e);
                break;
            }
        }
    }
}

impl StdioPipes {
    async fn write_line(&mut self, line: &str) -> Result<(), McpError> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the reply to `id` arrives.
    ///
    /// Blank lines and server-initiated messages are skipped, as are replies
    /// to earlier ids abandoned by a cancelled call. A reply with a null id
    /// (the server could not parse our request) is returned as-is.
    async fn read_response(&mut self, name: &str, id: u64) -> Result<JsonRpcResponse, McpError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line).await? == 0 {
                return Err(McpError::Protocol(format!(
                    "MCP server '{name}' closed its output while id {id} was pending"
                )));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                McpError::Protocol(format!("Malformed message from '{name}': {e}: {trimmed}"))
            })?;
            if let Some(method) = value.get("method").and_then(|m| m.as_str()) {
                tracing::debug!("Ignoring '{method}' from MCP server '{name}' (awaiting id {id})");
                continue;
            }

            let resp: JsonRpcResponse = serde_json::from_value(value).map_err(|e| {
                McpError::Protocol(format!("Malformed response from '{name}': {e}"))
            })?;
            match resp.id {
                None => return Ok(resp),
                Some(got) if got == id => return Ok(resp),
                Some(got) if got < id => {
                    tracing::warn!(
                        "Discarding stale response id={got} from MCP server '{name}' (awaiting {id})"
                    );
                }
                Some(got) => {
                    return Err(McpError::Protocol(format!(
                        "MCP server '{name}' answered id {got} while id {id} was pending"
                    )));
                }
            }
        }
    }
}
