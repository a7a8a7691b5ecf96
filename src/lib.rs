//! toolpilot: drive an MCP tool server with a text-completion model.
//!
//! The model is asked for one `FUNCTION_CALL: name|arg|...` or
//! `FINAL_ANSWER: ...` line per turn. Calls are mapped onto the tool's
//! declared parameters, executed against the server, and summarized into the
//! next prompt until the model answers or the iteration cap is reached.
//!
//! # Quick Start
//!
//! ```no_run
//! use toolpilot::prelude::*;
//!
//! # async fn example() -> toolpilot::error::Result<()> {
//! let config = PilotConfig::from_env()?;
//! let scenario = Scenario::from_config(ScenarioKind::Paint, &config)?;
//! let registry = toolpilot::mcp::connect(scenario.server.clone()).await?;
//! let backend = CompletionRequester::from_config(&config)?;
//!
//! let mut agent = AgentLoop::from_scenario(registry, backend, &scenario, &config);
//! let answer = agent.run(&scenario.goal).await.into_result()?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;
