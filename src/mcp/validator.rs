//! Envelope and argument validation.

use serde_json::Value;

use crate::error::{McpError, McpResult};
use crate::mcp::registry::{Arguments, ParameterSchema};
use crate::mcp::types::{JsonRpcRequest, RequestId, JSONRPC_VERSION};

/// Validate that a JSON-RPC request is well-formed.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{}\"",
            request.jsonrpc
        )));
    }

    if request.id == RequestId::Null {
        return Err(McpError::InvalidRequest(
            "Request id must be a string or an integer".to_string(),
        ));
    }

    if request.method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Check tool arguments against a parameter schema.
///
/// Every required parameter must be present, every present parameter must
/// have its declared type, and undeclared parameters are rejected.
pub fn validate_arguments(schema: &ParameterSchema, arguments: Value) -> McpResult<Arguments> {
    let args = match arguments {
        Value::Null => Arguments::new(),
        Value::Object(map) => map,
        other => {
            return Err(McpError::InvalidParams(format!(
                "arguments must be an object, got {}",
                json_type_name(&other)
            )))
        }
    };

    if let Some(unknown) = args.keys().find(|key| schema.get(key).is_none()) {
        return Err(McpError::InvalidParams(format!(
            "unknown parameter '{}'",
            unknown
        )));
    }

    for (name, spec) in schema.iter() {
        match args.get(name) {
            None if spec.required => {
                return Err(McpError::InvalidParams(format!(
                    "missing required parameter '{}'",
                    name
                )))
            }
            Some(value) if !spec.param_type.matches(value) => {
                return Err(McpError::InvalidParams(format!(
                    "parameter '{}' must be of type {}, got {}",
                    name,
                    spec.param_type,
                    json_type_name(value)
                )))
            }
            _ => {}
        }
    }

    Ok(args)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
