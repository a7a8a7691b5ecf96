//! Bridge an MCP session into the [`ToolRegistry`] seam.

use async_trait::async_trait;
use tracing::debug;

use crate::error::PilotError;
use crate::tools::{ToolArguments, ToolDescriptor, ToolOutput, ToolRegistry};

use super::client::{MCPClient, MCPToolCallResult};
use super::schema::MCPToolSchema;

#[async_trait]
trait MCPClientOps: Send {
    async fn initialize(&mut self) -> Result<(), PilotError>;
    async fn list_tools(&mut self) -> Result<Vec<MCPToolSchema>, PilotError>;
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<MCPToolCallResult, PilotError>;
    async fn close(&mut self) -> Result<(), PilotError>;
}

#[async_trait]
impl MCPClientOps for MCPClient {
    async fn initialize(&mut self) -> Result<(), PilotError> {
        MCPClient::initialize(self).await
    }

    async fn list_tools(&mut self) -> Result<Vec<MCPToolSchema>, PilotError> {
        MCPClient::list_tools(self).await
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<MCPToolCallResult, PilotError> {
        MCPClient::call_tool(self, name, arguments).await
    }

    async fn close(&mut self) -> Result<(), PilotError> {
        MCPClient::close(self).await
    }
}

/// Tool registry backed by a live MCP session.
pub struct McpToolRegistry {
    client: Box<dyn MCPClientOps>,
}

impl McpToolRegistry {
    pub fn new(client: MCPClient) -> Self {
        Self {
            client: Box::new(client),
        }
    }

    #[cfg(test)]
    fn from_client_ops(client: Box<dyn MCPClientOps>) -> Self {
        Self { client }
    }

    /// Shut down the session and the server process behind it.
    pub async fn shutdown(mut self) -> Result<(), PilotError> {
        self.client.close().await
    }
}

#[async_trait]
impl ToolRegistry for McpToolRegistry {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, PilotError> {
        self.client.initialize().await?;
        let tools = self.client.list_tools().await?;
        Ok(tools.into_iter().map(MCPToolSchema::into_descriptor).collect())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<ToolOutput, PilotError> {
        self.client.initialize().await?;
        let result = self.client.call_tool(name, arguments).await?;
        debug!(tool = name, items = result.text_items.len(), "MCP tool returned");
        Ok(into_output(result))
    }
}

fn into_output(result: MCPToolCallResult) -> ToolOutput {
    if result.text_items.is_empty() {
        if let Some(structured) = result.structured_content {
            return ToolOutput::Single(structured.to_string());
        }
    }
    ToolOutput::Many(result.text_items)
}
