//! Request dispatcher: routes a request to its protocol handler and turns
//! the outcome into a response envelope.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{McpError, McpResult};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::session::{Session, SessionState};
use crate::mcp::types::*;
use crate::mcp::validator::{validate_arguments, validate_request};

/// Routes requests for one server; shared read-only by all connections.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, server_info: ServerInfo) -> Self {
        Self {
            registry,
            server_info,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: ToolsCapability { list_changed: false },
        }
    }

    /// Handle one request against a connection's session state.
    ///
    /// Always yields exactly one response carrying the request's id.
    pub fn dispatch(&self, state: &mut SessionState, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        tracing::debug!("Dispatching {} (id {})", request.method, id);

        match self.route(state, request) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::warn!("Request {} failed: {}", id, e);
                e.into_response(id)
            }
        }
    }

    fn route(&self, state: &mut SessionState, request: JsonRpcRequest) -> McpResult<Value> {
        validate_request(&request)?;

        let method = Method::parse(&request.method)
            .ok_or_else(|| McpError::MethodNotFound(request.method.clone()))?;

        match method {
            Method::Initialize => self.handle_initialize(state, request.params),
            Method::ListTools => {
                if !state.is_ready() {
                    return Err(McpError::NotInitialized);
                }
                self.handle_list_tools()
            }
            Method::CallTool => {
                let session = state.session_mut().ok_or(McpError::NotInitialized)?;
                self.handle_call_tool(session, request.params)
            }
        }
    }

    fn handle_initialize(&self, state: &mut SessionState, params: Option<Value>) -> McpResult<Value> {
        if state.is_ready() {
            return Err(McpError::AlreadyInitialized);
        }

        let params: InitializeParams = serde_json::from_value(
            params.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        )
        .map_err(|e| McpError::InvalidParams(e.to_string()))?;

        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                "Client requested protocol version {}, server supports {}. Proceeding with server version.",
                params.protocol_version,
                MCP_VERSION
            );
        }

        let session = Session::new(MCP_VERSION.to_string(), params.client_info);
        tracing::info!(
            "Initialized session {} with client: {} v{}",
            session.id,
            session.client_info.name,
            session.client_info.version
        );
        *state = SessionState::Ready(session);

        to_result(InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: self.capabilities(),
            server_info: self.server_info.clone(),
        })
    }

    fn handle_list_tools(&self) -> McpResult<Value> {
        to_result(ListToolsResult {
            tools: self.registry.list().iter().map(|tool| tool.info()).collect(),
        })
    }

    fn handle_call_tool(&self, session: &mut Session, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams = parse_params(params, "Tool call params required")?;

        let tool = self
            .registry
            .lookup(&params.name)
            .ok_or_else(|| McpError::ToolNotFound(params.name.clone()))?;

        let args = validate_arguments(&tool.schema, params.arguments)?;

        session.record_call(&tool.name);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (tool.handler)(&args)));

        let result = match outcome {
            Ok(Ok(value)) => CallToolResult::text(render_value(&value)),
            Ok(Err(e)) => {
                tracing::info!("Tool {} reported failure: {}", tool.name, e);
                CallToolResult::error(e.to_string())
            }
            Err(_) => {
                tracing::error!("Tool {} panicked", tool.name);
                CallToolResult::error(format!("tool '{}' terminated unexpectedly", tool.name))
            }
        };

        to_result(result)
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>, missing: &str) -> McpResult<T> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams(missing.to_string()))
}

fn to_result<T: Serialize>(value: T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

/// Text form of a handler's return value
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}
