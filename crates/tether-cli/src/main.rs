//! tether CLI — talk to MCP servers from the command line.

mod render;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tether_mcp::{McpClient, McpConfig, McpRegistry};

#[derive(Parser)]
#[command(name = "tether", version, about = "Talk to MCP servers from the command line")]
struct Cli {
    /// Server definitions file (default: ~/.tether/mcp.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect every configured server and summarize it
    Servers,
    /// List the tools a server exposes
    Tools { server: String },
    /// Call a tool with JSON arguments
    Call {
        server: String,
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// List the resources a server exposes
    Resources { server: String },
    /// Read a resource by URI
    Read { server: String, uri: String },
    /// List the prompts a server exposes
    Prompts { server: String },
    /// Render a prompt
    Prompt {
        server: String,
        name: String,
        /// Prompt argument as key=value (repeatable)
        #[arg(long = "arg", value_parser = parse_key_val)]
        args: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(tether_mcp::config::default_config_path);
    let config = McpConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let registry = McpRegistry::new();
    let result = run(&registry, &config, cli.command).await;

    if let Err(e) = registry.disconnect_all().await {
        tracing::warn!("{e}");
    }
    result
}

async fn run(registry: &McpRegistry, config: &McpConfig, command: Command) -> Result<()> {
    match command {
        Command::Servers => {
            if config.servers.is_empty() {
                eprintln!("No MCP servers configured.");
                return Ok(());
            }
            for (name, err) in registry.connect_all(config).await {
                eprintln!("Warning: MCP server '{name}' failed to start: {err}");
            }
            for key in registry.list_connections().await {
                let client = registry.get_client(&key).await?;
                let tool_count = client.list_tools().await.map(|t| t.len()).ok();
                render::server(&client, tool_count);
            }
        }
        Command::Tools { server } => {
            let client = connect(registry, config, &server).await?;
            render::tools(&client.list_tools().await?);
        }
        Command::Call { server, tool, args } => {
            let arguments: serde_json::Value =
                serde_json::from_str(&args).context("--args must be valid JSON")?;
            if !arguments.is_object() {
                bail!("--args must be a JSON object");
            }
            let client = connect(registry, config, &server).await?;
            let result = client.call_tool(&tool, arguments).await?;
            render::contents(&result.content);
            if result.is_error {
                bail!("Tool '{tool}' reported an error");
            }
        }
        Command::Resources { server } => {
            let client = connect(registry, config, &server).await?;
            render::resources(&client.list_resources().await?);
        }
        Command::Read { server, uri } => {
            let client = connect(registry, config, &server).await?;
            render::contents(&client.read_resource(&uri).await?);
        }
        Command::Prompts { server } => {
            let client = connect(registry, config, &server).await?;
            render::prompts(&client.list_prompts().await?);
        }
        Command::Prompt { server, name, args } => {
            let client = connect(registry, config, &server).await?;
            let arguments: HashMap<String, String> = args.into_iter().collect();
            render::prompt(&client.get_prompt(&name, &arguments).await?);
        }
    }
    Ok(())
}

/// Connect the one server a command targets.
async fn connect(
    registry: &McpRegistry,
    config: &McpConfig,
    server: &str,
) -> Result<Arc<McpClient>> {
    let Some(server_config) = config.servers.get(server) else {
        bail!("No MCP server named '{server}' in the config");
    };
    registry
        .connect(server, server_config)
        .await
        .with_context(|| format!("Failed to connect to MCP server '{server}'"))
}
