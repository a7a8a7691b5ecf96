//! CLI entry point for toolpilot.

use clap::{Args, Parser, Subcommand};

use crate::agent_loop::ScenarioKind;
use crate::config::PilotConfig;

/// Prompt-driven agent for MCP tool servers
#[derive(Parser, Debug)]
#[command(name = "toolpilot", version, about = "toolpilot: drive an MCP tool server with an LLM")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one agent session against a tool server
    Run(RunArgs),
    /// Start the tool server and print its tool catalog
    Tools(ToolsArgs),
}

/// Options shared by every command that starts a tool server.
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Built-in scenario (paint, email)
    #[arg(long, default_value = "paint")]
    pub scenario: ScenarioKind,

    /// Tool server executable (replaces the scenario default)
    #[arg(long)]
    pub server_command: Option<String>,

    /// Argument for --server-command (repeatable)
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// Log only to the console
    #[arg(long)]
    pub no_log_file: bool,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Goal for the agent (defaults to the scenario's goal)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Iteration cap
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Per-completion timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Primary model id
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Arguments for the `tools` subcommand.
#[derive(Parser, Debug)]
pub struct ToolsArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

impl ServerArgs {
    /// Apply server overrides to a loaded config.
    pub fn apply(&self, mut config: PilotConfig) -> PilotConfig {
        if let Some(command) = &self.server_command {
            config.server_command = Some(command.clone());
            config.server_args = self.server_args.clone();
        }
        config
    }
}

impl RunArgs {
    /// Apply command-line overrides on top of the environment config.
    pub fn apply(&self, config: PilotConfig) -> PilotConfig {
        let mut config = self.server.apply(config);
        if let Some(max) = self.max_iterations {
            config = config.with_max_iterations(max);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_completion_timeout(std::time::Duration::from_secs(secs));
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        config
    }
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
