//! Shared test helpers: scripted completion backend and in-memory tool registry.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use toolpilot::completion::{Completion, CompletionBackend};
use toolpilot::error::PilotError;
use toolpilot::tools::{ParamKind, ToolArguments, ToolDescriptor, ToolOutput, ToolRegistry};
use toolpilot::types::Usage;

/// A backend that replays queued completions and records every prompt.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Completion, PilotError>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that answers with each line in turn.
    pub fn replying(texts: &[&str]) -> Self {
        let backend = Self::new();
        for text in texts {
            backend.queue_response(text);
        }
        backend
    }

    /// Queue a text response.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(Completion {
            text: text.to_string(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
            },
            model: "scripted".to_string(),
        }));
    }

    /// Queue a failed completion.
    pub fn queue_error(&self, error: PilotError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Handle on the recorded prompts that outlives the backend.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str) -> Result<Completion, PilotError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PilotError::Generation("script exhausted".into())))
    }
}

/// One recorded tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub tool: String,
    pub arguments: Value,
}

type Handler = Box<dyn Fn(&ToolArguments) -> Result<ToolOutput, PilotError> + Send>;

/// Registry whose tools are plain closures.
#[derive(Default)]
pub struct InMemoryRegistry {
    tools: Vec<ToolDescriptor>,
    handlers: HashMap<String, Handler>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    list_error: Option<String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool<F>(mut self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(&ToolArguments) -> Result<ToolOutput, PilotError> + Send + 'static,
    {
        self.handlers
            .insert(descriptor.name.clone(), Box::new(handler));
        self.tools.push(descriptor);
        self
    }

    /// Tool that always returns the same values.
    pub fn with_canned(self, descriptor: ToolDescriptor, values: &[&str]) -> Self {
        let output = ToolOutput::Many(values.iter().map(|v| v.to_string()).collect());
        self.with_tool(descriptor, move |_| Ok(output.clone()))
    }

    /// Make `list_tools` fail.
    pub fn failing_list(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        self.calls.clone()
    }

    pub fn called_tools(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.tool.clone())
            .collect()
    }
}

#[async_trait]
impl ToolRegistry for InMemoryRegistry {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, PilotError> {
        match &self.list_error {
            Some(message) => Err(PilotError::ServerStartup(message.clone())),
            None => Ok(self.tools.clone()),
        }
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: ToolArguments,
    ) -> Result<ToolOutput, PilotError> {
        self.calls.lock().unwrap().push(RecordedCall {
            tool: name.to_string(),
            arguments: Value::Object(arguments.clone()),
        });
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| PilotError::UnknownTool(name.to_string()))?;
        handler(&arguments)
    }
}

/// ASCII values of a string, one item per character.
pub fn ascii_values(arguments: &ToolArguments) -> Result<ToolOutput, PilotError> {
    let text = arguments
        .get("input_string")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(ToolOutput::Many(
        text.chars().map(|c| (c as u32).to_string()).collect(),
    ))
}

/// Sum of e^x over an integer list.
pub fn exponential_sum(arguments: &ToolArguments) -> Result<ToolOutput, PilotError> {
    let values = arguments
        .get("int_list")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let sum: f64 = values
        .iter()
        .filter_map(Value::as_i64)
        .map(|v| (v as f64).exp())
        .sum();
    Ok(ToolOutput::Many(vec![sum.to_string()]))
}

pub fn ascii_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        "strings_to_chars_to_int",
        "Return the ASCII values of the characters in a word",
    )
    .param("input_string", ParamKind::String)
}

pub fn exponential_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        "int_list_to_exponential_sum",
        "Return sum of exponentials of numbers in a list",
    )
    .param("int_list", ParamKind::Array)
}

pub fn add_descriptor() -> ToolDescriptor {
    ToolDescriptor::new("add", "Add two numbers")
        .param("a", ParamKind::Integer)
        .param("b", ParamKind::Integer)
}

pub fn send_email_descriptor() -> ToolDescriptor {
    ToolDescriptor::new("send-email", "Send an email")
        .param("recipient_id", ParamKind::String)
        .param("subject", ParamKind::String)
        .param("message", ParamKind::String)
}

/// Integer addition over `a` and `b`.
pub fn add(arguments: &ToolArguments) -> Result<ToolOutput, PilotError> {
    let a = arguments.get("a").and_then(Value::as_i64).unwrap_or_default();
    let b = arguments.get("b").and_then(Value::as_i64).unwrap_or_default();
    Ok(ToolOutput::Many(vec![(a + b).to_string()]))
}

/// Registry with the calculation tools used by the INDIA scenario.
pub fn calculation_registry() -> InMemoryRegistry {
    InMemoryRegistry::new()
        .with_tool(add_descriptor(), add)
        .with_tool(ascii_descriptor(), ascii_values)
        .with_tool(exponential_descriptor(), exponential_sum)
}
