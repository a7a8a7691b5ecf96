//! The agent loop: prompt, complete, parse, coerce, invoke, repeat.

use chrono::{Local, NaiveDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::completion::CompletionBackend;
use crate::config::PilotConfig;
use crate::error::PilotError;
use crate::tools::{ToolArguments, ToolDescriptor, ToolRegistry};
use crate::types::Usage;

use super::coerce::{apply_email_template, is_calculation_tool, resolve_tool, ArgumentCoercer};
use super::events::{RunEventEmitter, RunEventPayload, RunEventSink, RunLifecycle};
use super::parser::{parse_response, Command};
use super::prompt::{self, PromptTemplate};
use super::scenario::{FollowUp, Scenario};
use super::types::{AgentState, IterationRecord, RunId, RunResult, RunStatus};

/// Drives one tool registry with one completion backend.
///
/// Each call to [`AgentLoop::run`] starts from a fresh [`AgentState`].
pub struct AgentLoop<R, C> {
    registry: R,
    backend: C,
    template: PromptTemplate,
    coercer: ArgumentCoercer,
    follow_up: Option<FollowUp>,
    max_iterations: u32,
    event_sink: Option<RunEventSink>,
    clock: fn() -> NaiveDateTime,
    status: RunStatus,
}

enum Step {
    Continue,
    Finished(String),
}

impl<R, C> AgentLoop<R, C>
where
    R: ToolRegistry,
    C: CompletionBackend,
{
    pub fn new(registry: R, backend: C, template: PromptTemplate) -> Self {
        Self {
            registry,
            backend,
            template,
            coercer: ArgumentCoercer::default(),
            follow_up: None,
            max_iterations: crate::config::DEFAULT_MAX_ITERATIONS,
            event_sink: None,
            clock: local_now,
            status: RunStatus::Idle,
        }
    }

    /// Loop configured with a scenario's prompt and follow-up and the
    /// config's iteration cap and recipient.
    pub fn from_scenario(registry: R, backend: C, scenario: &Scenario, config: &PilotConfig) -> Self {
        let mut agent = Self::new(registry, backend, scenario.template.clone())
            .with_max_iterations(config.max_iterations)
            .with_coercer(ArgumentCoercer::new(config.recipient_email.clone()));
        agent.follow_up = scenario.follow_up.clone();
        agent
    }

    pub fn with_coercer(mut self, coercer: ArgumentCoercer) -> Self {
        self.coercer = coercer;
        self
    }

    pub fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_event_sink(mut self, sink: RunEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Clock used to stamp templated email bodies.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn into_registry(self) -> R {
        self.registry
    }

    /// Run until a final answer, a fatal error or the iteration cap.
    pub async fn run(&mut self, goal: &str) -> RunResult {
        let run_id = Uuid::new_v4();
        let emitter = RunEventEmitter::new(run_id, self.event_sink.clone());
        let mut state = AgentState::new();
        let mut usage = Usage::default();

        self.status = RunStatus::Running;
        emitter.lifecycle(RunLifecycle::Started);
        info!(%run_id, max_iterations = self.max_iterations, "Starting agent run");

        let tools = match self.registry.list_tools().await {
            Ok(tools) => tools,
            Err(err) => {
                error!(error = %err, "Failed to list tools");
                return self.fail(&emitter, run_id, err, 0, state, usage);
            }
        };
        info!(count = tools.len(), "Loaded tools");

        while state.iteration < self.max_iterations {
            let iteration = state.iteration + 1;
            info!(iteration, "--- Iteration {iteration} ---");
            emitter.emit(RunEventPayload::IterationStarted { iteration });

            let prompt = prompt::compose(&self.template, &tools, goal, &state.transcript);
            debug!(iteration, prompt_len = prompt.len(), "Composed prompt");

            let completion = match self.backend.complete(&prompt).await {
                Ok(completion) => completion,
                Err(err) => {
                    error!(iteration, error = %err, "Failed to get LLM response");
                    return self.fail(&emitter, run_id, err, iteration, state, usage);
                }
            };
            usage.merge(&completion.usage);
            let text = completion.text.trim().to_string();
            info!(iteration, response = %text, "LLM response");
            emitter.emit(RunEventPayload::CompletionReceived { text: text.clone() });

            let commands = parse_response(&text);
            if commands.is_empty() {
                warn!(iteration, "Response contained no FUNCTION_CALL or FINAL_ANSWER");
                return self.fail(&emitter, run_id, PilotError::Parse(text), iteration, state, usage);
            }

            let mut batch = commands.into_iter();
            while let Some(command) = batch.next() {
                let step = match command {
                    Command::FinalAnswer { text } => Step::Finished(text),
                    Command::Invoke { tool, args } => {
                        self.invoke(&tools, &tool, &args, iteration, &mut state, &emitter)
                            .await
                    }
                };
                if let Step::Finished(answer) = step {
                    let discarded: Vec<String> = batch
                        .by_ref()
                        .filter_map(|command| match command {
                            Command::Invoke { tool, .. } => Some(tool),
                            Command::FinalAnswer { .. } => None,
                        })
                        .collect();
                    if !discarded.is_empty() {
                        warn!(iteration, ?discarded, "Run finished with commands left in the batch");
                    }
                    info!(iteration, answer = %answer, "Agent execution complete");
                    return self.complete(&emitter, run_id, answer, iteration, state, usage);
                }
            }

            state.iteration += 1;
        }

        let max = self.max_iterations;
        warn!(max_iterations = max, "Iteration limit reached without a final answer");
        let iterations = state.iteration;
        self.fail(
            &emitter,
            run_id,
            PilotError::MaxIterationsExceeded(max),
            iterations,
            state,
            usage,
        )
    }

    async fn invoke(
        &mut self,
        tools: &[ToolDescriptor],
        tool: &str,
        args: &[String],
        iteration: u32,
        state: &mut AgentState,
        emitter: &RunEventEmitter,
    ) -> Step {
        let arguments = match self.prepare_arguments(tools, tool, args, state) {
            Ok(arguments) => arguments,
            Err(err) => return skip(tool, args, err, emitter),
        };

        let shown = serde_json::Value::Object(arguments.clone());
        info!(tool, arguments = %shown, "Calling tool");
        emitter.emit(RunEventPayload::ToolCallStarted {
            tool: tool.to_string(),
            arguments: shown,
        });

        let output = match self.registry.call_tool(tool, arguments.clone()).await {
            Ok(output) => output,
            Err(err) => return skip(tool, args, err, emitter),
        };

        let rendered = output.render();
        debug!(tool, result = %rendered, "Tool result");
        emitter.emit(RunEventPayload::ToolResult {
            tool: tool.to_string(),
            result: rendered.clone(),
        });

        if is_calculation_tool(tool) {
            if let Some(first) = output.first() {
                info!(tool, result = first, "Stored calculation result");
                state.last_calculation = Some(first.to_string());
            }
        }
        state.record(IterationRecord {
            iteration,
            tool: tool.to_string(),
            arguments,
            result: output,
        });

        match &self.follow_up {
            Some(follow_up) if follow_up.triggered_by(tool) => {
                run_follow_up(&mut self.registry, follow_up, &rendered, emitter).await;
                Step::Finished(rendered)
            }
            _ => Step::Continue,
        }
    }

    fn prepare_arguments(
        &self,
        tools: &[ToolDescriptor],
        tool: &str,
        args: &[String],
        state: &AgentState,
    ) -> Result<ToolArguments, PilotError> {
        let descriptor = resolve_tool(tools, tool)?;
        let mut arguments = self.coercer.coerce(descriptor, args)?;
        apply_email_template(
            tool,
            &mut arguments,
            state.last_calculation.as_deref(),
            (self.clock)(),
        );
        Ok(arguments)
    }

    fn complete(
        &mut self,
        emitter: &RunEventEmitter,
        run_id: RunId,
        answer: String,
        iterations: u32,
        state: AgentState,
        usage: Usage,
    ) -> RunResult {
        self.status = RunStatus::Completed;
        emitter.lifecycle(RunLifecycle::Completed);
        RunResult::completed(run_id, answer, iterations, state, usage)
    }

    fn fail(
        &mut self,
        emitter: &RunEventEmitter,
        run_id: RunId,
        err: PilotError,
        iterations: u32,
        state: AgentState,
        usage: Usage,
    ) -> RunResult {
        self.status = RunStatus::Failed;
        emitter.lifecycle(RunLifecycle::Failed {
            error: err.to_string(),
        });
        RunResult::failed(run_id, err, iterations, state, usage)
    }
}

/// Log a command that will not run and report it as skipped.
fn skip(tool: &str, args: &[String], err: PilotError, emitter: &RunEventEmitter) -> Step {
    if err.is_coercion_failure() {
        warn!(tool, raw_args = ?args, error = %err, "Skipping command");
    } else {
        error!(tool, raw_args = ?args, error = %err, "Error in function call");
    }
    emitter.emit(RunEventPayload::CommandSkipped {
        tool: tool.to_string(),
        reason: err.to_string(),
    });
    Step::Continue
}

/// Follow-up failures are logged and reported as events only.
async fn run_follow_up<R: ToolRegistry>(
    registry: &mut R,
    follow_up: &FollowUp,
    result: &str,
    emitter: &RunEventEmitter,
) {
    info!(trigger = %follow_up.trigger_tool, "Calculation complete, running follow-up");
    for step in &follow_up.steps {
        let arguments = step.arguments_for(result);
        let outcome = match registry.call_tool(&step.tool, arguments).await {
            Ok(output) => {
                info!(tool = %step.tool, result = %output.render(), "Follow-up step done");
                Ok(output.render())
            }
            Err(err) => {
                error!(tool = %step.tool, error = %err, "Follow-up step failed");
                Err(err.to_string())
            }
        };
        emitter.emit(RunEventPayload::FollowUpStep {
            tool: step.tool.clone(),
            result: outcome,
        });
        if let Some(pause) = step.pause_after {
            tokio::time::sleep(pause).await;
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
