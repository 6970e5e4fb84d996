//! Error types for the MCP tool server
//!
//! This module defines the error hierarchy for all operations in the crate.
//! Protocol failures (`McpError`) and tool failures (`ToolError`) are kept
//! as separate types: the former becomes a JSON-RPC `error`, the latter a
//! successful response carrying `isError: true`.

use thiserror::Error;

use crate::mcp::types::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Application-reserved error codes
pub mod mcp_error_codes {
    pub const SESSION_NOT_INITIALIZED: i32 = -32002;
    pub const SESSION_ALREADY_INITIALIZED: i32 = -32003;
    pub const TOOL_NOT_FOUND: i32 = -32803;
}

/// Main error type for the MCP tool server
#[derive(Error, Debug)]
pub enum ToolServerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tool registration errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Client-side errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Protocol-level failures, returned as the `error` member of a response
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Session not initialized: call initialize first")]
    NotInitialized,

    #[error("Session already initialized")]
    AlreadyInitialized,

    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}

impl McpError {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::NotInitialized => SESSION_NOT_INITIALIZED,
            McpError::AlreadyInitialized => SESSION_ALREADY_INITIALIZED,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
        }
    }

    /// Convert into the wire error object
    pub fn to_json_rpc_error(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }

    /// Build a full error response for the given request id
    pub fn into_response(self, id: RequestId) -> crate::mcp::types::JsonRpcResponse {
        crate::mcp::types::JsonRpcResponse::error(id, self.to_json_rpc_error())
    }
}

/// Tool registration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Tool already registered: {name}")]
    DuplicateName { name: String },

    #[error("Tool name must not be empty")]
    EmptyName,

    #[error("Unsupported parameter type '{type_name}' for parameter '{parameter}'")]
    UnsupportedType { parameter: String, type_name: String },

    #[error("Invalid parameter schema: {message}")]
    InvalidSchema { message: String },
}

/// Failures reported by a tool handler that ran
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("File size {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Client-side errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Client not initialized: call initialize first")]
    NotInitialized,

    #[error("Client already initialized")]
    AlreadyInitialized,

    /// The server answered with a protocol-level error
    #[error("Server returned error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("Response id {received} does not match request id {expected}")]
    IdMismatch { expected: String, received: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// JSON-RPC code when the server rejected the request
    pub fn protocol_code(&self) -> Option<i32> {
        match self {
            ClientError::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvVar { var: String, value: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to create working directory: {path}")]
    DirCreationFailed { path: String },
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ToolServerError>;

/// Result type alias for protocol dispatch
pub type McpResult<T> = std::result::Result<T, McpError>;

/// Result type alias for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;
