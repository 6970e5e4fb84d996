//! MCP client
//!
//! Drives the protocol from the caller's side: handshake, tool discovery and
//! tool invocation. Protocol errors returned by the server are surfaced as
//! `ClientError::Protocol`; tool failures come back as a `CallToolResult`
//! with `is_error` set, exactly as the server delivered them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ClientError, ClientResult};
use crate::mcp::transport::Transport;
use crate::mcp::types::*;

/// Identity the client announces during `initialize`
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "mcp-tool-client".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: MCP_VERSION.to_string(),
        }
    }
}

/// Summary of the client's state
#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub client_name: String,
    pub client_version: String,
    pub initialized: bool,
    pub server_info: Option<ServerInfo>,
    pub server_capabilities: Option<ServerCapabilities>,
    pub available_tools_count: usize,
}

/// MCP client over any transport
pub struct McpClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    next_id: i64,
    server: Option<InitializeResult>,
    tools: Vec<ToolInfo>,
}

impl<T: Transport> McpClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            next_id: 0,
            server: None,
            tools: Vec::new(),
        }
    }

    /// Perform the handshake; allowed exactly once
    pub async fn initialize(&mut self) -> ClientResult<&InitializeResult> {
        if self.server.is_some() {
            return Err(ClientError::AlreadyInitialized);
        }

        let params = InitializeParams {
            protocol_version: self.config.protocol_version.clone(),
            client_info: ClientInfo {
                name: self.config.name.clone(),
                version: self.config.version.clone(),
            },
            capabilities: ClientCapabilities::default(),
        };
        let result: InitializeResult = self
            .request(methods::INITIALIZE, Some(serde_json::to_value(params)?))
            .await?;

        tracing::info!(
            "Connected to {} v{} (protocol {})",
            result.server_info.name,
            result.server_info.version,
            result.protocol_version
        );
        Ok(&*self.server.insert(result))
    }

    /// Fetch the server's tools, replacing the cached list
    pub async fn discover_tools(&mut self) -> ClientResult<&[ToolInfo]> {
        self.ensure_initialized()?;

        let result: ListToolsResult = self.request(methods::LIST_TOOLS, None).await?;
        tracing::debug!("Discovered {} tools", result.tools.len());
        self.tools = result.tools;
        Ok(&self.tools)
    }

    /// Invoke a tool by name
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> ClientResult<CallToolResult> {
        self.ensure_initialized()?;

        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        let result: CallToolResult = self.request(methods::CALL_TOOL, Some(params)).await?;
        if result.is_error {
            tracing::debug!("Tool {} reported failure", name);
        }
        Ok(result)
    }

    pub fn is_initialized(&self) -> bool {
        self.server.is_some()
    }

    /// Tools cached by the last `discover_tools`
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&ToolInfo> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn server_capabilities(&self) -> Option<&ServerCapabilities> {
        self.server.as_ref().map(|s| &s.capabilities)
    }

    pub fn info(&self) -> ClientSummary {
        ClientSummary {
            client_name: self.config.name.clone(),
            client_version: self.config.version.clone(),
            initialized: self.is_initialized(),
            server_info: self.server.as_ref().map(|s| s.server_info.clone()),
            server_capabilities: self.server_capabilities().cloned(),
            available_tools_count: self.tools.len(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn ensure_initialized(&self) -> ClientResult<()> {
        if self.server.is_none() {
            return Err(ClientError::NotInitialized);
        }
        Ok(())
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId::Number(self.next_id)
    }

    async fn request<R: DeserializeOwned>(&mut self, method: &str, params: Option<Value>) -> ClientResult<R> {
        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id.clone(), method, params);

        let raw = self.transport.exchange(serde_json::to_string(&request)?).await?;
        let response: JsonRpcResponse = serde_json::from_str(&raw)
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

        if response.id != id {
            return Err(ClientError::IdMismatch {
                expected: id.to_string(),
                received: response.id.to_string(),
            });
        }

        match (response.result, response.error) {
            (_, Some(error)) => Err(ClientError::Protocol {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => serde_json::from_value(result)
                .map_err(|e| ClientError::MalformedResponse(e.to_string())),
            (None, None) => Err(ClientError::MalformedResponse(
                "response carries neither result nor error".to_string(),
            )),
        }
    }
}
