use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mcp_plugins::plugins::test_plugin_dir;
use mcp_plugins::{http, stdio, HostConfig, McpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mcp", version, about = "Model Context Protocol plugin host")]
struct Cli {
    /// Host configuration file (TOML or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve MCP over stdio or HTTP (default)
    Serve {
        #[arg(long)]
        transport: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Plugin development commands
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
}

#[derive(Subcommand)]
enum PluginCommand {
    /// Check a plugin directory: layout, manifest, initialization, smoke cases
    Test { path: PathBuf },
    /// List configured plugins and their tools
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env for local dev (if present)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let config = HostConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Logs go to stderr; stdout carries the stdio protocol.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mcp_plugins={}", config.server.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if dotenv_loaded {
        tracing::info!("Loaded .env");
    }

    match cli.command.unwrap_or(Command::Serve {
        transport: None,
        port: None,
    }) {
        Command::Serve { transport, port } => {
            let mut config = config;
            if let Some(transport) = transport {
                config.server.transport = transport;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Plugin {
            command: PluginCommand::Test { path },
        } => {
            let report = test_plugin_dir(&path)
                .await
                .with_context(|| format!("failed to test plugin at {}", path.display()))?;
            println!("{}", report);
            if !report.passed() {
                bail!("plugin test failed");
            }
            Ok(())
        }
        Command::Plugin {
            command: PluginCommand::List,
        } => {
            let server = McpServer::from_config(config).await?;
            for status in server.plugin_manager().statuses()? {
                println!(
                    "{} v{} [{:?}{}]",
                    status.name,
                    status.version,
                    status.state,
                    if status.enabled { "" } else { ", disabled" }
                );
                for tool in status.tools {
                    println!("  - {}", tool);
                }
            }
            server.shutdown().await?;
            Ok(())
        }
    }
}

async fn serve(config: HostConfig) -> Result<()> {
    tracing::info!("Starting MCP plugin host");
    tracing::info!(
        "Configuration loaded: transport={}, port={}",
        config.server.transport,
        config.server.port
    );

    let transport = config.server.transport.to_lowercase();
    let port = config.server.port;
    let server = Arc::new(McpServer::from_config(config).await?);

    let tools = server.get_tools()?;
    tracing::info!("Available tools: {}", tools.len());
    for tool in &tools {
        tracing::info!("  - {}: {}", tool.name, tool.description);
    }

    match transport.as_str() {
        "http" => {
            tracing::info!("MCP plugin host running with HTTP transport on port {}", port);
            http::run_http_server(Arc::clone(&server), port).await?;
        }
        _ => {
            tracing::info!("MCP plugin host running with stdio transport");
            stdio::serve(&server, tokio::io::stdin(), tokio::io::stdout()).await?;
        }
    }

    server.shutdown().await?;
    tracing::info!("MCP plugin host shutting down");
    Ok(())
}
