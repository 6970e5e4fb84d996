//! MCP Server implementation
//!
//! A `Server` owns the tool registry and dispatcher; every client connection
//! gets its own `Connection` holding that connection's session. Transports
//! for stdio and TCP carry newline-delimited JSON.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::{McpError, Result};
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::registry::ToolRegistry;
use crate::mcp::session::SessionState;
use crate::mcp::types::*;
use crate::tools;

/// MCP server: shared registry and dispatcher
#[derive(Clone)]
pub struct Server {
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Create a server with the builtin tools registered
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let mut registry = ToolRegistry::new();
        tools::register_builtin_tools(&mut registry, config.clone())?;
        Ok(Self::with_registry(registry, &config))
    }

    /// Create a server around a caller-built registry
    pub fn with_registry(registry: ToolRegistry, config: &Config) -> Self {
        let server_info = ServerInfo {
            name: config.server_name.clone(),
            version: config.server_version.clone(),
        };
        tracing::info!(
            "MCP server {} v{} ready with {} tools",
            server_info.name,
            server_info.version,
            registry.len()
        );

        Self {
            dispatcher: Arc::new(Dispatcher::new(Arc::new(registry), server_info)),
        }
    }

    /// Open a new connection with a fresh, uninitialized session
    pub fn connect(&self) -> Connection {
        Connection {
            dispatcher: self.dispatcher.clone(),
            state: SessionState::default(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }
}

/// Server-side end of one client connection
pub struct Connection {
    dispatcher: Arc<Dispatcher>,
    state: SessionState,
}

impl Connection {
    /// Handle one raw JSON-RPC message and produce the raw response
    pub fn handle(&mut self, raw: &str) -> String {
        let response = self.handle_message(raw);
        serde_json::to_string(&response).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize response: {}", e);
            format!(
                r#"{{"jsonrpc":"{}","id":null,"error":{{"code":{},"message":"Internal error"}}}}"#,
                JSONRPC_VERSION,
                crate::error::error_codes::INTERNAL_ERROR
            )
        })
    }

    /// Handle one raw JSON-RPC message
    pub fn handle_message(&mut self, raw: &str) -> JsonRpcResponse {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => return McpError::ParseError(e.to_string()).into_response(RequestId::Null),
        };

        // Keep the id when the rest of the envelope is malformed
        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok())
            .unwrap_or_default();

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request),
            Err(e) => McpError::InvalidRequest(e.to_string()).into_response(id),
        }
    }

    /// Dispatch an already decoded request
    pub fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.dispatcher.dispatch(&mut self.state, request)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_ready()
    }

    /// Snapshot of this connection's server statistics
    pub fn stats(&self) -> ServerStats {
        let session = self.state.session();
        ServerStats {
            server_info: self.dispatcher.server_info().clone(),
            session_id: session.map(|s| s.id.to_string()),
            initialized: self.state.is_ready(),
            protocol_version: session.map(|s| s.protocol_version.clone()),
            client_info: session.map(|s| s.client_info.clone()),
            initialized_at: session.map(|s| s.initialized_at),
            tools: self.dispatcher.registry().names(),
            call_stats: session.map(|s| s.call_counts().clone()).unwrap_or_default(),
            capabilities: self.dispatcher.capabilities(),
        }
    }
}

/// Statistics for one connection
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub server_info: ServerInfo,
    pub session_id: Option<String>,
    pub initialized: bool,
    pub protocol_version: Option<String>,
    pub client_info: Option<ClientInfo>,
    pub initialized_at: Option<DateTime<Utc>>,
    pub tools: Vec<String>,
    pub call_stats: HashMap<String, u64>,
    pub capabilities: ServerCapabilities,
}

/// Serve one connection over a line-oriented byte stream until EOF
pub async fn serve_connection<R, W>(mut connection: Connection, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // Handlers do blocking file I/O; keep them off the async workers
                let line = line.to_string();
                let (returned, response) = tokio::task::spawn_blocking(move || {
                    let response = connection.handle(&line);
                    (connection, response)
                })
                .await
                .map_err(|e| McpError::InternalError(e.to_string()))?;
                connection = returned;
                response
            }
            Err(e) => {
                tracing::warn!("Discarding line that is not valid UTF-8: {}", e);
                parse_error_line(&e.to_string())
            }
        };

        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    tracing::info!("Connection closed");
    Ok(())
}

fn parse_error_line(detail: &str) -> String {
    let response = McpError::ParseError(detail.to_string()).into_response(RequestId::Null);
    serde_json::to_string(&response).unwrap_or_else(|_| {
        format!(
            r#"{{"jsonrpc":"{}","id":null,"error":{{"code":{},"message":"Parse error"}}}}"#,
            JSONRPC_VERSION,
            crate::error::error_codes::PARSE_ERROR
        )
    })
}

/// Run the server on stdio
pub async fn serve_stdio(server: &Server) -> Result<()> {
    tracing::info!("Stdio transport started");
    serve_connection(server.connect(), tokio::io::stdin(), tokio::io::stdout()).await
}

/// Run the server on a TCP listener, one session per accepted connection
pub async fn serve_tcp(server: Server, listener: TcpListener) -> Result<()> {
    tracing::info!("TCP transport listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let connection = server.connect();
        tracing::info!("Accepted connection from {}", peer);

        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            if let Err(e) = serve_connection(connection, reader, writer).await {
                tracing::warn!("Connection {} ended with error: {}", peer, e);
            }
        });
    }
}
