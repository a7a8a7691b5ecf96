//! Model Context Protocol (MCP) client, tool-server launch and registry bridge.

pub mod bridge;
pub mod client;
pub mod launcher;
pub mod schema;
pub mod transport;

pub use bridge::McpToolRegistry;
pub use client::MCPClient;
pub use launcher::{wait_for_marker, LaunchedServer, ServerLauncher, ServerSpec};
pub use transport::{MCPTransport, StdioTransport};

use tracing::warn;

use crate::error::PilotError;
use crate::util::timeout::with_timeout;

/// Launch a tool server, wait for readiness and open an MCP session on it.
///
/// The handshake shares the spec's startup timeout. On failure the client is
/// dropped, which kills the server process.
pub async fn connect(spec: ServerSpec) -> Result<McpToolRegistry, PilotError> {
    let startup_timeout = spec.startup_timeout;
    let launcher = ServerLauncher::new(spec);
    let transport = StdioTransport::launch(&launcher).await?;
    let mut client = MCPClient::new(Box::new(transport));

    match with_timeout(startup_timeout, client.initialize()).await {
        Ok(()) => Ok(McpToolRegistry::new(client)),
        Err(PilotError::Timeout(ms)) => {
            warn!(timeout_ms = ms, "Tool server did not answer the MCP handshake");
            Err(PilotError::ServerStartup(format!(
                "MCP initialize timed out after {ms}ms"
            )))
        }
        Err(err) => Err(err),
    }
}
