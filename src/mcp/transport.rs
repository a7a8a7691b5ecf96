//! MCP transport layer.

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceExt};
use tokio::process::Child;
use tracing::{debug, warn};

use super::launcher::{LaunchedServer, ServerLauncher};
use crate::error::PilotError;

pub type DynClientService = Box<dyn DynService<RoleClient>>;
pub type MCPRunningService = RunningService<RoleClient, DynClientService>;

/// Transport trait for MCP communication.
#[async_trait]
pub trait MCPTransport: Send {
    /// Create and initialize a new rmcp running service for this transport.
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError>;

    /// Close the transport.
    async fn close(&mut self) -> Result<(), PilotError>;
}

/// Stdio transport over a server process started by [`ServerLauncher`].
///
/// The process's stdio carries exactly one session; once connected the
/// transport cannot reconnect.
pub struct StdioTransport {
    server: Option<LaunchedServer>,
    child: Option<Child>,
    closed: bool,
}

impl StdioTransport {
    /// Wrap an already launched (and ready) server.
    pub fn new(server: LaunchedServer) -> Self {
        Self {
            server: Some(server),
            child: None,
            closed: false,
        }
    }

    /// Launch the server and wrap it.
    pub async fn launch(launcher: &ServerLauncher) -> Result<Self, PilotError> {
        Ok(Self::new(launcher.launch().await?))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl MCPTransport for StdioTransport {
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError> {
        if self.closed {
            return Err(ClientInitializeError::ConnectionClosed(
                "MCP transport closed".into(),
            ));
        }
        let server = self.server.take().ok_or_else(|| {
            ClientInitializeError::ConnectionClosed("server stdio already in use".into())
        })?;

        debug!(pid = ?server.id(), "Opening MCP session over server stdio");
        let (child, stdout, stdin) = server.into_parts();
        self.child = Some(child);
        client_info.into_dyn().serve((stdout, stdin)).await
    }

    async fn close(&mut self) -> Result<(), PilotError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.server = None;
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "Failed to stop tool server");
                return Err(PilotError::Io(err));
            }
        }
        Ok(())
    }
}
