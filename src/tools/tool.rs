//! Tool registry trait and tool output values.

use async_trait::async_trait;

use super::types::ToolDescriptor;
use crate::error::PilotError;

/// Coerced arguments for a tool call, keyed by parameter name.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// Result of a tool invocation: one string, or one string per content item.
///
/// MCP servers always answer with a content list, so their results are
/// `Many` even when the list has a single entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Single(String),
    Many(Vec<String>),
}

impl ToolOutput {
    /// First returned value.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }

    /// Render as prompt text; lists render as `[a, b, c]`.
    pub fn render(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Many(values) => format!("[{}]", values.join(", ")),
        }
    }
}

impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// A process (or in-memory stand-in) that exposes named tools.
///
/// Calls are issued one at a time; implementations may assume no
/// concurrent invocations.
#[async_trait]
pub trait ToolRegistry: Send {
    /// Snapshot of the available tools.
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, PilotError>;

    /// Invoke a tool and wait for it to finish.
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<ToolOutput, PilotError>;
}
