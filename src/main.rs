//! toolpilot CLI binary entry point.

use std::sync::Arc;

use toolpilot::agent_loop::{AgentLoop, RunEvent, RunEventPayload, RunLifecycle, Scenario};
use toolpilot::cli::{Cli, Commands, RunArgs, ServerArgs, ToolsArgs};
use toolpilot::completion::CompletionRequester;
use toolpilot::config::PilotConfig;
use toolpilot::error::PilotError;
use toolpilot::tools::ToolRegistry;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let result = match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::Tools(args) => handle_tools(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(err) = e.downcast_ref::<PilotError>() {
            eprintln!("Hint: {}", failure_hint(err));
        }
        std::process::exit(1);
    }
}

fn init_logging(server: &ServerArgs, config: &PilotConfig) -> CliResult {
    let dir = (!server.no_log_file).then_some(config.log_dir.as_path());
    if let Some(path) = toolpilot::logging::init(dir)? {
        eprintln!("Logging to {}", path.display());
    }
    Ok(())
}

async fn handle_run(args: RunArgs) -> CliResult {
    let config = args.apply(PilotConfig::from_env()?);
    init_logging(&args.server, &config)?;
    tracing::debug!(?config, "Loaded configuration");

    // Fail on missing configuration before the server is started.
    config.require_api_key()?;
    let scenario = Scenario::from_config(args.server.scenario, &config)?;
    let goal = args.query.clone().unwrap_or_else(|| scenario.goal.clone());
    let backend = CompletionRequester::from_config(&config)?;

    let registry = toolpilot::mcp::connect(scenario.server.clone()).await?;
    let mut agent = AgentLoop::from_scenario(registry, backend, &scenario, &config)
        .with_event_sink(Arc::new(print_event));

    let result = agent.run(&goal).await;
    if let Err(err) = agent.into_registry().shutdown().await {
        tracing::warn!(error = %err, "Tool server did not shut down cleanly");
    }

    eprintln!(
        "\n{} after {} iteration(s), {} tool call(s) recorded",
        if result.is_completed() { "Completed" } else { "Failed" },
        result.iterations,
        result.transcript.len()
    );
    let answer = result.into_result()?;
    println!("{answer}");
    Ok(())
}

async fn handle_tools(args: ToolsArgs) -> CliResult {
    let config = args.server.apply(PilotConfig::from_env()?);
    init_logging(&args.server, &config)?;

    let scenario = Scenario::from_config(args.server.scenario, &config)?;
    let mut registry = toolpilot::mcp::connect(scenario.server.clone()).await?;
    let tools = registry.list_tools().await;
    if let Err(err) = registry.shutdown().await {
        tracing::warn!(error = %err, "Tool server did not shut down cleanly");
    }

    println!("{}", toolpilot::agent_loop::prompt::render_catalog(&tools?));
    Ok(())
}

fn failure_hint(err: &PilotError) -> String {
    let hint = err.recovery_suggestion().hint();
    if err.is_retryable() {
        format!("{hint} (transient failure)")
    } else {
        hint.to_string()
    }
}

fn print_event(event: RunEvent) {
    match &event.payload {
        RunEventPayload::IterationStarted { iteration } => {
            eprintln!("\n--- Iteration {iteration} ---");
        }
        RunEventPayload::CompletionReceived { text } => {
            eprintln!("LLM: {}", truncate(text, 200));
        }
        RunEventPayload::ToolCallStarted { tool, arguments } => {
            eprintln!("⚡ {tool} {arguments}");
        }
        RunEventPayload::ToolResult { result, .. } => {
            eprintln!("  ✅ {}", truncate(result, 200));
        }
        RunEventPayload::CommandSkipped { tool, reason } => {
            eprintln!("  ⏭  {tool}: {reason}");
        }
        RunEventPayload::FollowUpStep { tool, result } => match result {
            Ok(text) => eprintln!("✓ {tool}: {}", truncate(text, 200)),
            Err(error) => eprintln!("  ❌ {tool}: {error}"),
        },
        RunEventPayload::Lifecycle {
            state: RunLifecycle::Failed { error },
        } => {
            eprintln!("\n❌ {error}");
        }
        RunEventPayload::Lifecycle { .. } => {}
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    // Find a valid UTF-8 char boundary at or before max
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
