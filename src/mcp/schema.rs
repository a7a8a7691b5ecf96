//! MCP schema types.

use serde::{Deserialize, Serialize};

use crate::tools::ToolDescriptor;

/// Schema for a tool exposed by an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPToolSchema {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

impl MCPToolSchema {
    pub fn into_descriptor(self) -> ToolDescriptor {
        ToolDescriptor::from_input_schema(self.name, self.description, &self.input_schema)
    }
}
