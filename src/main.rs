//! MCP Tool Server - Rust Implementation
//!
//! Runs the tool server over stdio or TCP, or acts as a one-shot client
//! against a running TCP server.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::net::TcpListener;

use mcp_tool_server::config::Config;
use mcp_tool_server::mcp::client::McpClient;
use mcp_tool_server::mcp::server::{serve_stdio, serve_tcp, Server};
use mcp_tool_server::mcp::transport::TcpTransport;

/// MCP Tool Server
#[derive(Parser)]
#[command(name = "mcp-tool-server")]
#[command(author, version, about = "MCP Tool Server - schema-described tools over JSON-RPC")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server (stdio unless --tcp is given)
    Serve {
        /// Listen on TCP instead of stdio
        #[arg(long)]
        tcp: bool,

        /// Listen address (defaults to MCP_SERVER_HOST:MCP_SERVER_PORT)
        #[arg(long)]
        addr: Option<String>,
    },

    /// List the tools of a running TCP server
    Tools {
        /// Server address
        #[arg(long)]
        addr: Option<String>,
    },

    /// Call one tool on a running TCP server
    Call {
        /// Server address
        #[arg(long)]
        addr: Option<String>,

        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::new().context("failed to load configuration")?;

    // Logs go to stderr; stdout is the protocol channel
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        None => run_server(config, false, None).await?,
        Some(Commands::Serve { tcp, addr }) => run_server(config, tcp, addr).await?,
        Some(Commands::Tools { addr }) => {
            let addr = addr.unwrap_or_else(|| config.listen_addr());
            let mut client = McpClient::new(TcpTransport::connect(addr.as_str()).await?);
            client.initialize().await?;
            for tool in client.discover_tools().await? {
                println!("{}: {}", tool.name, tool.description);
                for (name, spec) in &tool.parameters {
                    let required = if spec.required { ", required" } else { "" };
                    println!("    {} ({}{}) {}", name, spec.param_type, required, spec.description);
                }
            }
        }
        Some(Commands::Call {
            addr,
            tool,
            arguments,
        }) => {
            let arguments: Value =
                serde_json::from_str(&arguments).context("arguments must be a JSON object")?;
            let addr = addr.unwrap_or_else(|| config.listen_addr());
            let mut client = McpClient::new(TcpTransport::connect(addr.as_str()).await?);
            client.initialize().await?;

            let result = client.call_tool(&tool, arguments).await?;
            println!("{}", result.text_content());
            if result.is_error {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config, tcp: bool, addr: Option<String>) -> anyhow::Result<()> {
    config.ensure_work_dir()?;
    let listen_addr = addr.unwrap_or_else(|| config.listen_addr());
    let server = Server::new(config)?;

    if tcp {
        let listener = TcpListener::bind(&listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", listen_addr))?;
        serve_tcp(server, listener).await?;
    } else {
        serve_stdio(&server).await?;
    }

    Ok(())
}
