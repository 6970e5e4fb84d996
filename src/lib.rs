//! MCP Tool Server Library
//!
//! A minimal Model Context Protocol server and client for tool invocation.
//! The server exposes schema-described tools over JSON-RPC 2.0; the client
//! performs the handshake, discovers tools and calls them by name.

pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;

pub use config::Config;
pub use error::{ClientError, McpError, Result, ToolError, ToolServerError};
pub use mcp::client::McpClient;
pub use mcp::server::Server;
