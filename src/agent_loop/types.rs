//! Core run types for the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PilotError;
use crate::tools::{ToolArguments, ToolOutput};
use crate::types::Usage;

/// Unique run identifier.
pub type RunId = Uuid;

/// Run lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One successful tool invocation, as fed back into the next prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    /// 1-based iteration the call happened in.
    pub iteration: u32,
    pub tool: String,
    pub arguments: ToolArguments,
    pub result: ToolOutput,
}

impl IterationRecord {
    /// Sentence describing this call for the running query.
    pub fn summary(&self) -> String {
        format!(
            "In the {} iteration you called {} with {} parameters, and the function returned {}.",
            self.iteration,
            self.tool,
            serde_json::Value::Object(self.arguments.clone()),
            self.result.render()
        )
    }
}

/// Mutable state threaded through one run. Never shared between runs.
#[derive(Debug, Default)]
pub struct AgentState {
    /// Completed iterations.
    pub iteration: u32,
    pub last_result: Option<ToolOutput>,
    /// First value returned by the most recent calculation tool.
    pub last_calculation: Option<String>,
    pub transcript: Vec<IterationRecord>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: IterationRecord) {
        self.last_result = Some(record.result.clone());
        self.transcript.push(record);
    }
}

/// Outcome of [`AgentLoop::run`](super::AgentLoop::run).
#[derive(Debug)]
pub struct RunResult {
    pub run_id: RunId,
    pub status: RunStatus,
    pub final_answer: Option<String>,
    /// Iterations started before the run ended.
    pub iterations: u32,
    pub transcript: Vec<IterationRecord>,
    pub usage: Usage,
    pub error: Option<PilotError>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub(crate) fn completed(
        run_id: RunId,
        answer: String,
        iterations: u32,
        state: AgentState,
        usage: Usage,
    ) -> Self {
        Self {
            run_id,
            status: RunStatus::Completed,
            final_answer: Some(answer),
            iterations,
            transcript: state.transcript,
            usage,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub(crate) fn failed(
        run_id: RunId,
        error: PilotError,
        iterations: u32,
        state: AgentState,
        usage: Usage,
    ) -> Self {
        Self {
            run_id,
            status: RunStatus::Failed,
            final_answer: None,
            iterations,
            transcript: state.transcript,
            usage,
            error: Some(error),
            finished_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The final answer, or the error that ended the run.
    pub fn into_result(self) -> Result<String, PilotError> {
        match (self.final_answer, self.error) {
            (Some(answer), None) => Ok(answer),
            (_, Some(error)) => Err(error),
            (None, None) => Err(PilotError::InvalidState(
                "run finished without an answer or an error".into(),
            )),
        }
    }
}
