//! `read_file` and `write_file`
//!
//! Relative paths resolve against the configured working directory. Both
//! tools refuse files larger than `Config::max_file_size`.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{RegistryError, ToolError};
use crate::mcp::registry::{Arguments, ToolRegistry};
use crate::tools::str_arg;

pub fn register(registry: &mut ToolRegistry, config: Arc<Config>) -> Result<(), RegistryError> {
    let read_config = config.clone();
    registry.register(
        "read_file",
        "Read the contents of a text file",
        &read_file_schema(),
        move |args: &Arguments| read_file(&read_config, args),
    )?;

    registry.register(
        "write_file",
        "Write content to a file, creating parent directories as needed",
        &write_file_schema(),
        move |args: &Arguments| write_file(&config, args),
    )
}

fn read_file(config: &Config, args: &Arguments) -> Result<Value, ToolError> {
    let path = str_arg(args, "path")?;
    let resolved = config.resolve_path(path);

    if !resolved.is_file() {
        return Err(ToolError::FileNotFound {
            path: path.to_string(),
        });
    }

    let size = std::fs::metadata(&resolved)?.len();
    check_size(size, config.max_file_size)?;

    let content = std::fs::read_to_string(&resolved).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => {
            ToolError::Failed(format!("{} is not valid UTF-8 text", path))
        }
        _ => ToolError::Io(e),
    })?;

    tracing::debug!("Read {} bytes from {}", size, resolved.display());
    Ok(Value::String(content))
}

fn write_file(config: &Config, args: &Arguments) -> Result<Value, ToolError> {
    let path = str_arg(args, "path")?;
    let content = str_arg(args, "content")?;
    check_size(content.len() as u64, config.max_file_size)?;

    let resolved = config.resolve_path(path);
    if let Some(parent) = resolved.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_parent(parent)?;
    }
    std::fs::write(&resolved, content)?;

    tracing::debug!("Wrote {} bytes to {}", content.len(), resolved.display());
    Ok(Value::String(format!(
        "Wrote {} bytes to {}",
        content.len(),
        path
    )))
}

fn check_size(size: u64, max: u64) -> Result<(), ToolError> {
    if size > max {
        return Err(ToolError::FileTooLarge { size, max });
    }
    Ok(())
}

fn create_parent(parent: &Path) -> Result<(), ToolError> {
    if !parent.exists() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn read_file_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "Path of the file to read"
            }
        },
        "required": ["path"]
    })
}

fn write_file_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "Path of the file to write"
            },
            "content": {
                "type": "string",
                "description": "Content to write"
            }
        },
        "required": ["path", "content"]
    })
}
