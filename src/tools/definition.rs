//! Tool definitions published through `tools/list`
//!
//! Each definition carries a JSON Schema for its arguments, built up one
//! parameter at a time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::requests::ToolRequest;

/// A tool as advertised to MCP clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (e.g., "search_requests", "get_curl")
    pub name: String,
    /// Human-readable description for the client
    pub description: String,
    /// JSON schema for input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Whether the tool changes ProxyPin state
    #[serde(skip)]
    pub mutating: bool,
}

impl Tool {
    /// Create a new tool definition with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            mutating: false,
        }
    }

    /// Definition for a typed request; name and mutating flag come from `T`
    pub fn for_request<T: ToolRequest>(description: impl Into<String>) -> Self {
        let mut tool = Self::new(T::NAME, description);
        tool.mutating = T::MUTATING;
        tool
    }

    /// Add a required parameter
    pub fn required(mut self, name: &str, param_type: &str, description: &str) -> Self {
        self.insert_property(name, param_type, description, None);
        if let Some(required) = self.input_schema["required"].as_array_mut() {
            required.push(Value::String(name.to_string()));
        }
        self
    }

    /// Add an optional parameter
    pub fn optional(mut self, name: &str, param_type: &str, description: &str) -> Self {
        self.insert_property(name, param_type, description, None);
        self
    }

    /// Add an optional parameter with a default value
    pub fn with_default(mut self, name: &str, param_type: &str, description: &str, default: Value) -> Self {
        self.insert_property(name, param_type, description, Some(default));
        self
    }

    fn insert_property(&mut self, name: &str, param_type: &str, description: &str, default: Option<Value>) {
        let mut prop = Map::new();
        prop.insert("type".to_string(), Value::String(param_type.to_string()));
        prop.insert("description".to_string(), Value::String(description.to_string()));
        if let Some(default) = default {
            prop.insert("default".to_string(), default);
        }
        if let Some(properties) = self.input_schema["properties"].as_object_mut() {
            properties.insert(name.to_string(), Value::Object(prop));
        }
    }

    /// Names of the required parameters
    pub fn required_params(&self) -> Vec<&str> {
        self.input_schema["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}
