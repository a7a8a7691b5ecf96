//! Tool-server process launch and readiness detection.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::PilotError;

const STDERR_TAIL_LINES: usize = 20;

/// How to start a tool server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSpec {
    pub command: String,
    pub args: Vec<String>,
    /// Literal string the server prints on stdout once it accepts requests.
    pub ready_marker: Option<String>,
    pub startup_timeout: Duration,
}

impl ServerSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            ready_marker: None,
            startup_timeout: crate::config::DEFAULT_STARTUP_TIMEOUT,
        }
    }

    pub fn with_ready_marker(mut self, marker: impl Into<String>) -> Self {
        self.ready_marker = Some(marker.into());
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Command line as it would be typed in a shell.
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A spawned server whose stdio has not yet been handed to the MCP session.
///
/// The child is killed when this value (or the transport owning it) drops.
#[derive(Debug)]
pub struct LaunchedServer {
    pub(crate) child: Child,
    pub(crate) stdout: BufReader<ChildStdout>,
    pub(crate) stdin: ChildStdin,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
}

impl LaunchedServer {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Most recent stderr lines from the server.
    pub fn stderr_tail(&self) -> String {
        read_tail(&self.stderr_tail)
    }

    pub(crate) fn into_parts(self) -> (Child, BufReader<ChildStdout>, ChildStdin) {
        (self.child, self.stdout, self.stdin)
    }
}

/// Spawns tool servers described by a [`ServerSpec`].
pub struct ServerLauncher {
    spec: ServerSpec,
}

impl ServerLauncher {
    pub fn new(spec: ServerSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ServerSpec {
        &self.spec
    }

    /// Spawn the server and, when a marker is configured, wait for it.
    pub async fn launch(&self) -> Result<LaunchedServer, PilotError> {
        let spec = &self.spec;
        info!(command = %spec.display_command(), "Starting tool server");

        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            PilotError::ServerStartup(format!("failed to spawn `{}`: {e}", spec.display_command()))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PilotError::ServerStartup("failed to capture server stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PilotError::ServerStartup("failed to capture server stdout".into()))?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        if let Some(stderr) = child.stderr.take() {
            let tail = Arc::clone(&stderr_tail);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "toolpilot::server", "{line}");
                    push_tail(&tail, line);
                }
            });
        }

        let mut server = LaunchedServer {
            child,
            stdout: BufReader::new(stdout),
            stdin,
            stderr_tail,
        };

        if let Some(marker) = spec.ready_marker.as_deref() {
            if let Err(err) =
                wait_for_marker(&mut server.stdout, marker, spec.startup_timeout).await
            {
                return Err(startup_failure(&mut server, err).await);
            }
            info!(marker, "Tool server reported ready");
        } else {
            debug!("No readiness marker configured; connecting immediately");
        }

        Ok(server)
    }
}

/// Read lines from `reader` until one contains `marker`.
///
/// Lines before the marker are logged and discarded. Anything buffered after
/// the marker line stays in the reader.
pub async fn wait_for_marker<R>(
    reader: &mut R,
    marker: &str,
    timeout: Duration,
) -> Result<(), PilotError>
where
    R: AsyncBufRead + Unpin,
{
    let scan = async {
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line).await?;
            if read == 0 {
                return Err(PilotError::ServerStartup(format!(
                    "server closed stdout before printing {marker}"
                )));
            }
            let trimmed = line.trim_end();
            debug!(line = trimmed, "server stdout");
            if trimmed.contains(marker) {
                return Ok(());
            }
        }
    };

    match tokio::time::timeout(timeout, scan).await {
        Ok(result) => result,
        Err(_) => Err(PilotError::ServerStartup(format!(
            "server did not print {marker} within {}s",
            timeout.as_secs()
        ))),
    }
}

async fn startup_failure(server: &mut LaunchedServer, err: PilotError) -> PilotError {
    let exit = match server.child.try_wait() {
        Ok(Some(status)) => format!(" (exited with {status})"),
        _ => String::new(),
    };
    if let Err(kill_err) = server.child.kill().await {
        warn!(error = %kill_err, "Failed to stop tool server after startup failure");
    }
    // Give the stderr reader a moment to drain what the process left behind.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stderr = server.stderr_tail();
    let message = match err {
        PilotError::ServerStartup(message) => message,
        other => other.to_string(),
    };
    if stderr.is_empty() {
        PilotError::ServerStartup(format!("{message}{exit}"))
    } else {
        PilotError::ServerStartup(format!("{message}{exit}; stderr: {stderr}"))
    }
}

fn push_tail(tail: &Mutex<VecDeque<String>>, line: String) {
    if let Ok(mut lines) = tail.lock() {
        if lines.len() == STDERR_TAIL_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }
}

fn read_tail(tail: &Mutex<VecDeque<String>>) -> String {
    tail.lock()
        .map(|lines| lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n"))
        .unwrap_or_default()
}
