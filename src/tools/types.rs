//! Tool descriptors: names, ordered parameter schemas, descriptions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Primitive kind declared for a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParamKind {
    Integer,
    Number,
    Array,
    String,
}

impl ParamKind {
    /// Map a JSON-schema `type` string; anything unrecognized is passed
    /// through as text.
    pub fn from_schema_type(raw: Option<&str>) -> Self {
        raw.and_then(|t| t.parse().ok()).unwrap_or(Self::String)
    }
}

/// One named, typed parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    /// Declared schema type as shown in the prompt catalog (`unknown` when absent).
    pub type_label: String,
}

/// A tool advertised by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Builder: append a parameter of the given kind.
    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.parameters.push(ToolParameter {
            name: name.into(),
            kind,
            type_label: kind.to_string(),
        });
        self
    }

    /// Build a descriptor from an MCP `inputSchema` object.
    ///
    /// Parameters keep the declaration order of `properties`.
    pub fn from_input_schema(
        name: impl Into<String>,
        description: Option<String>,
        schema: &serde_json::Value,
    ) -> Self {
        let parameters = schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(param_name, info)| {
                        let declared = info.get("type").and_then(|t| t.as_str());
                        ToolParameter {
                            name: param_name.clone(),
                            kind: ParamKind::from_schema_type(declared),
                            type_label: declared.unwrap_or("unknown").to_string(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: name.into(),
            description: description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "No description available".to_string()),
            parameters,
        }
    }

    /// `name(param: type, ...) - description`
    pub fn signature(&self) -> String {
        let params = if self.parameters.is_empty() {
            "no parameters".to_string()
        } else {
            self.parameters
                .iter()
                .map(|p| format!("{}: {}", p.name, p.type_label))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{}({}) - {}", self.name, params, self.description)
    }
}
