//! Tool registry
//!
//! Pure storage plus lookup: the registry never runs a handler.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{RegistryError, ToolError};
use crate::mcp::types::{ParamSpec, ParamType, ToolInfo};

/// Arguments passed to a handler, already validated against its schema
pub type Arguments = Map<String, Value>;

/// A tool implementation
pub type ToolHandler = Arc<dyn Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync>;

/// Parameter declarations for one tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    params: BTreeMap<String, ParamSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter declaration
    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                param_type,
                description: description.into(),
                required,
            },
        );
        self
    }

    /// Parse a JSON-Schema style object:
    /// `{"type": "object", "properties": {...}, "required": [...]}`
    pub fn from_json(schema: &Value) -> Result<Self, RegistryError> {
        let obj = schema.as_object().ok_or_else(|| RegistryError::InvalidSchema {
            message: "schema must be an object".to_string(),
        })?;

        let required: Vec<&str> = match obj.get("required") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().ok_or_else(|| RegistryError::InvalidSchema {
                        message: "required entries must be strings".to_string(),
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(RegistryError::InvalidSchema {
                    message: "required must be an array".to_string(),
                })
            }
        };

        let mut params = BTreeMap::new();
        if let Some(properties) = obj.get("properties") {
            let properties = properties.as_object().ok_or_else(|| RegistryError::InvalidSchema {
                message: "properties must be an object".to_string(),
            })?;

            for (name, prop) in properties {
                let type_name = prop.get("type").and_then(Value::as_str).ok_or_else(|| {
                    RegistryError::InvalidSchema {
                        message: format!("parameter '{}' has no type", name),
                    }
                })?;
                let param_type =
                    ParamType::from_name(type_name).ok_or_else(|| RegistryError::UnsupportedType {
                        parameter: name.clone(),
                        type_name: type_name.to_string(),
                    })?;
                let description = prop
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                params.insert(
                    name.clone(),
                    ParamSpec {
                        param_type,
                        description,
                        required: required.contains(&name.as_str()),
                    },
                );
            }
        }

        if let Some(missing) = required.iter().find(|name| !params.contains_key(**name)) {
            return Err(RegistryError::InvalidSchema {
                message: format!("required parameter '{}' is not declared", missing),
            });
        }

        Ok(Self { params })
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamSpec)> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// A registered tool
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: ParameterSchema,
    pub handler: ToolHandler,
}

impl ToolDefinition {
    /// Wire form for `tools/list`
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema.params.clone(),
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Registry of tools, keyed by unique name and kept in registration order
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool from a JSON-Schema style parameter description
    pub fn register<F>(
        &mut self,
        name: &str,
        description: &str,
        schema: &Value,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let schema = ParameterSchema::from_json(schema)?;
        self.register_with_schema(name, description, schema, handler)
    }

    /// Register a tool with an already typed schema
    pub fn register_with_schema<F>(
        &mut self,
        name: &str,
        description: &str,
        schema: ParameterSchema,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&Arguments) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.index.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
            });
        }

        self.index.insert(name.to_string(), self.tools.len());
        self.tools.push(ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler: Arc::new(handler),
        });

        tracing::info!("Registered tool: {}", name);
        Ok(())
    }

    /// Find a tool by name
    pub fn lookup(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in registration order
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
