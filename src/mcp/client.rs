//! MCP client for a tool server session.

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, JsonObject, ProtocolVersion, ResourceContents,
};
use rmcp::service::{ClientInitializeError, ServiceError};
use tracing::{debug, info};

use super::schema::MCPToolSchema;
use super::transport::{MCPRunningService, MCPTransport};
use crate::error::PilotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MCPConnectionState {
    Disconnected,
    Connected,
    Initialized,
    Closed,
}

/// Text extracted from a successful tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct MCPToolCallResult {
    /// One entry per text content item, in order.
    pub text_items: Vec<String>,
    pub structured_content: Option<serde_json::Value>,
}

/// Client for a Model Context Protocol server.
pub struct MCPClient {
    transport: Option<Box<dyn MCPTransport>>,
    session: Option<MCPRunningService>,
    state: MCPConnectionState,
}

impl MCPClient {
    /// Create a new MCP client with the given transport.
    pub fn new(transport: Box<dyn MCPTransport>) -> Self {
        Self {
            transport: Some(transport),
            session: None,
            state: MCPConnectionState::Disconnected,
        }
    }

    /// Create a client from an already-running rmcp service.
    pub fn from_running_service(session: MCPRunningService) -> Self {
        Self {
            transport: None,
            session: Some(session),
            state: MCPConnectionState::Connected,
        }
    }

    /// Convert an rmcp initialization result into an MCP client.
    pub fn from_running_service_result(
        result: Result<MCPRunningService, ClientInitializeError>,
    ) -> Result<Self, PilotError> {
        result
            .map(Self::from_running_service)
            .map_err(map_client_initialize_error)
    }

    pub fn connection_state(&self) -> MCPConnectionState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == MCPConnectionState::Initialized
    }

    /// Run the MCP handshake if it has not happened yet.
    pub async fn initialize(&mut self) -> Result<(), PilotError> {
        if let Some(session) = self.session.as_ref() {
            if session.is_closed() {
                self.session = None;
                self.state = MCPConnectionState::Closed;
                return Err(PilotError::Stream("MCP session is closed".into()));
            }
            self.state = MCPConnectionState::Initialized;
            return Ok(());
        }

        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| PilotError::Configuration("Missing MCP session".into()))?;

        let client_info = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };
        let session = transport
            .connect(client_info)
            .await
            .map_err(map_client_initialize_error)?;

        if let Some(peer) = session.peer_info() {
            info!(server = %peer.server_info.name, "MCP session initialized");
        }
        self.session = Some(session);
        self.state = MCPConnectionState::Initialized;
        Ok(())
    }

    /// List available tools from the MCP server.
    pub async fn list_tools(&mut self) -> Result<Vec<MCPToolSchema>, PilotError> {
        self.ensure_initialized()?;
        let session = self.session_mut()?;

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => session
                .list_tools(None)
                .await
                .map(|page| page.tools)
                .map_err(|e| map_service_error("list_tools", e))?,
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        debug!(count = tools.len(), "Listed MCP tools");
        Ok(tools.into_iter().map(map_mcp_tool_schema).collect())
    }

    /// Execute a tool on the MCP server.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<MCPToolCallResult, PilotError> {
        self.ensure_initialized()?;
        let session = self.session_mut()?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|e| map_service_error("call_tool", e))?;

        map_call_result(name, result)
    }

    /// End the session and stop the server.
    pub async fn close(&mut self) -> Result<(), PilotError> {
        if let Some(session) = self.session.take() {
            if let Err(err) = session.cancel().await {
                debug!(error = %err, "MCP session did not shut down cleanly");
            }
        }
        if let Some(transport) = self.transport.as_mut() {
            transport.close().await?;
        }
        self.state = MCPConnectionState::Closed;
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), PilotError> {
        match self.state {
            MCPConnectionState::Initialized => Ok(()),
            MCPConnectionState::Closed => Err(PilotError::Stream("MCP session is closed".into())),
            _ => Err(PilotError::UnsupportedOperation(
                "MCP client must be initialized first".into(),
            )),
        }
    }

    fn session_mut(&mut self) -> Result<&mut MCPRunningService, PilotError> {
        self.session
            .as_mut()
            .ok_or_else(|| PilotError::Configuration("Missing MCP session".into()))
    }
}

fn map_mcp_tool_schema(tool: rmcp::model::Tool) -> MCPToolSchema {
    MCPToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
    }
}

fn extract_text_items(content: &[Content]) -> Vec<String> {
    let mut items = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            items.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                items.push(text.clone());
            }
        }
    }
    items
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<MCPToolCallResult, PilotError> {
    let text_items = extract_text_items(&result.content);

    if result.is_error.unwrap_or(false) {
        let message = result
            .structured_content
            .as_ref()
            .map(|v| v.to_string())
            .or_else(|| (!text_items.is_empty()).then(|| text_items.join("\n")))
            .unwrap_or_else(|| "MCP tool returned an error result".into());

        return Err(PilotError::ToolExecution {
            tool_name: name.to_string(),
            message,
        });
    }

    Ok(MCPToolCallResult {
        text_items,
        structured_content: result.structured_content,
    })
}

fn map_client_initialize_error(error: ClientInitializeError) -> PilotError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            PilotError::ServerStartup(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => PilotError::ServerStartup(
            format!("MCP initialize transport error ({context}): {error}"),
        ),
        ClientInitializeError::JsonRpcError(error) => PilotError::Provider {
            provider: "mcp".into(),
            message: format!(
                "MCP initialize JSON-RPC error {}: {}",
                error.code.0, error.message
            ),
        },
        ClientInitializeError::Cancelled => {
            PilotError::ServerStartup("MCP initialize cancelled".into())
        }
        other => PilotError::Provider {
            provider: "mcp".into(),
            message: format!("MCP initialize error: {other}"),
        },
    }
}

fn map_service_error(context: &str, error: ServiceError) -> PilotError {
    match error {
        ServiceError::McpError(error) => PilotError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: MCP error {}: {}", error.code.0, error.message),
        },
        ServiceError::TransportSend(error) => {
            PilotError::Stream(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            PilotError::Stream(format!("{context}: MCP transport closed"))
        }
        ServiceError::UnexpectedResponse => PilotError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: unexpected MCP response"),
        },
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            PilotError::Stream(format!("{context}: MCP request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => PilotError::Timeout(timeout.as_millis() as u64),
        other => PilotError::Provider {
            provider: "mcp".into(),
            message: format!("{context}: MCP service error: {other}"),
        },
    }
}
