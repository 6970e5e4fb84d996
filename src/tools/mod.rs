//! Builtin tools
//!
//! Registered once when a `Server` is built. They are ordinary registry
//! entries with no special status.

pub mod calculator;
pub mod clock;
pub mod files;

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::{RegistryError, ToolError};
use crate::mcp::registry::{Arguments, ToolRegistry};

/// Register `read_file`, `write_file`, `calculate` and `get_current_time`
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    config: Arc<Config>,
) -> Result<(), RegistryError> {
    files::register(registry, config)?;
    calculator::register(registry)?;
    clock::register(registry)?;
    Ok(())
}

/// Fetch a string argument; the dispatcher has already checked its type
pub(crate) fn str_arg<'a>(args: &'a Arguments, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgument(format!("'{}' must be a string", name)))
}
