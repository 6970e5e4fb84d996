//! MCP (Model Context Protocol) module
//!
//! Implements the tool-invocation protocol: wire types, registry,
//! dispatcher, server sessions, and the client.

pub mod client;
pub mod dispatcher;
pub mod registry;
pub mod server;
pub mod session;
pub mod transport;
pub mod types;
pub mod validator;
