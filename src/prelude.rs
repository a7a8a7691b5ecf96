//! Convenience re-exports for common use.

pub use crate::agent_loop::{AgentLoop, RunEvent, RunEventPayload, RunResult, RunStatus, Scenario, ScenarioKind};
pub use crate::completion::{Completion, CompletionBackend, CompletionRequester};
pub use crate::config::PilotConfig;
pub use crate::error::{PilotError, Result};
pub use crate::provider::ModelProvider;
pub use crate::tools::{ParamKind, ToolArguments, ToolDescriptor, ToolOutput, ToolRegistry};
pub use crate::types::{GenerationSettings, Usage};
