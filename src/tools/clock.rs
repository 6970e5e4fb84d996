//! `get_current_time`

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Local, Timelike};
use serde_json::{json, Value};

use crate::error::{RegistryError, ToolError};
use crate::mcp::registry::{Arguments, ToolRegistry};

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "get_current_time",
        "Get the current system time",
        &get_current_time_schema(),
        |args: &Arguments| {
            let format = args.get("format").and_then(Value::as_str).unwrap_or("iso");
            current_time(Local::now(), format)
        },
    )
}

fn current_time(now: DateTime<Local>, format: &str) -> Result<Value, ToolError> {
    let formatted = match format {
        "iso" => now.to_rfc3339(),
        "timestamp" => now.timestamp().to_string(),
        pattern => {
            let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                return Err(ToolError::InvalidArgument(format!(
                    "invalid time format '{}'",
                    pattern
                )));
            }
            now.format_with_items(items.into_iter()).to_string()
        }
    };

    Ok(json!({
        "format": format,
        "formatted_time": formatted,
        "timestamp": now.timestamp(),
        "iso_format": now.to_rfc3339(),
        "components": {
            "year": now.year(),
            "month": now.month(),
            "day": now.day(),
            "hour": now.hour(),
            "minute": now.minute(),
            "second": now.second()
        }
    }))
}

fn get_current_time_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "format": {
                "type": "string",
                "description": "\"iso\" (default), \"timestamp\", or a strftime pattern such as \"%Y-%m-%d\""
            }
        }
    })
}
