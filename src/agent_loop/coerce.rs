//! Argument coercion from positional string tokens to typed tool arguments,
//! plus the tool-specific rules that adjust it.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::RECIPIENT_KEY;
use crate::error::{PilotError, Result};
use crate::tools::{ParamKind, ToolArguments, ToolDescriptor, ToolParameter};

/// Takes every remaining token as its single array argument.
pub const EXPONENTIAL_SUM_TOOL: &str = "int_list_to_exponential_sum";
pub const ASCII_VALUES_TOOL: &str = "strings_to_chars_to_int";
pub const SEND_EMAIL_TOOL: &str = "send-email";
pub const RECIPIENT_PARAMETER: &str = "recipient_id";

const MESSAGE_PARAMETER: &str = "message";
const TEMPLATE_TRIGGERS: [&str; 3] = ["sum", "exponential", "calculation"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether a tool's first returned value is remembered as the last
/// calculation result.
pub fn is_calculation_tool(name: &str) -> bool {
    name == EXPONENTIAL_SUM_TOOL || name == ASCII_VALUES_TOOL
}

/// Look a tool up in the registry snapshot.
pub fn resolve_tool<'a>(tools: &'a [ToolDescriptor], name: &str) -> Result<&'a ToolDescriptor> {
    tools
        .iter()
        .find(|tool| tool.name == name)
        .ok_or_else(|| PilotError::UnknownTool(name.to_string()))
}

/// Maps positional tokens onto a tool's declared parameters.
#[derive(Debug, Clone, Default)]
pub struct ArgumentCoercer {
    recipient_email: Option<String>,
}

impl ArgumentCoercer {
    pub fn new(recipient_email: Option<String>) -> Self {
        Self { recipient_email }
    }

    /// Consume tokens left to right, one per parameter, except for array
    /// parameters of tools that drain the rest of the queue.
    pub fn coerce(&self, tool: &ToolDescriptor, tokens: &[String]) -> Result<ToolArguments> {
        let mut queue: VecDeque<&str> = tokens.iter().map(String::as_str).collect();
        let mut arguments = ToolArguments::new();

        for param in &tool.parameters {
            let Some(token) = queue.pop_front() else {
                return Err(PilotError::InsufficientArguments {
                    tool: tool.name.clone(),
                    expected: tool.parameters.len(),
                    supplied: tokens.len(),
                });
            };
            debug!(tool = %tool.name, parameter = %param.name, kind = %param.kind, value = token, "Converting parameter");

            let value = match param.kind {
                ParamKind::Integer => parse_integer(param, token)?,
                ParamKind::Number => parse_number(param, token)?,
                ParamKind::Array if drains_remaining_tokens(&tool.name) => {
                    let mut values = parse_int_list(param, token)?;
                    for rest in queue.drain(..) {
                        values.extend(parse_int_list(param, rest)?);
                    }
                    int_array(values)
                }
                ParamKind::Array => int_array(parse_int_list(param, token)?),
                ParamKind::String => {
                    Value::String(substitute_recipient(param, token, self.recipient_email.as_deref())?)
                }
            };
            arguments.insert(param.name.clone(), value);
        }

        Ok(arguments)
    }
}

/// The exponential-sum tool receives its list as separate tokens.
pub fn drains_remaining_tokens(tool: &str) -> bool {
    tool == EXPONENTIAL_SUM_TOOL
}

/// Replace the literal `recipient_id` placeholder with the configured address.
pub fn substitute_recipient(
    param: &ToolParameter,
    token: &str,
    recipient: Option<&str>,
) -> Result<String> {
    if param.name != RECIPIENT_PARAMETER || token != RECIPIENT_PARAMETER {
        return Ok(token.to_string());
    }
    recipient
        .map(str::to_string)
        .ok_or_else(|| PilotError::missing(RECIPIENT_KEY))
}

/// Overwrite the message of a `send-email` call with the result template
/// when it talks about the calculation and a result is known.
///
/// Returns whether the message was replaced.
pub fn apply_email_template(
    tool: &str,
    arguments: &mut ToolArguments,
    last_calculation: Option<&str>,
    now: NaiveDateTime,
) -> bool {
    if tool != SEND_EMAIL_TOOL {
        return false;
    }
    let Some(result) = last_calculation else {
        return false;
    };
    let Some(Value::String(message)) = arguments.get(MESSAGE_PARAMETER) else {
        return false;
    };
    let lowered = message.to_lowercase();
    if !TEMPLATE_TRIGGERS.iter().any(|t| lowered.contains(t)) {
        return false;
    }

    info!(result, "Updating email message with latest calculation result");
    arguments.insert(
        MESSAGE_PARAMETER.to_string(),
        Value::String(email_body(result, now)),
    );
    true
}

/// Fixed body for result emails.
pub fn email_body(result: &str, now: NaiveDateTime) -> String {
    format!(
        "Hi User,\n\nThe problem statement was to find the 'Sum of exponentials of ASCII values of string [INDIA]'. This has been computed and here is the result:\n\nThe sum of exponentials is: {result} [Computed Date / Time: {}]",
        now.format(TIMESTAMP_FORMAT)
    )
}

fn type_error(param: &ToolParameter, expected: &str, value: &str) -> PilotError {
    PilotError::ArgumentType {
        parameter: param.name.clone(),
        expected: expected.to_string(),
        value: value.to_string(),
    }
}

fn parse_integer(param: &ToolParameter, token: &str) -> Result<Value> {
    token
        .trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|_| type_error(param, "integer", token))
}

fn parse_number(param: &ToolParameter, token: &str) -> Result<Value> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| type_error(param, "number", token))
}

/// `[1, 2,3]`, `1,2` and `7` all parse; empty pieces are ignored.
fn parse_int_list(param: &ToolParameter, token: &str) -> Result<Vec<i64>> {
    token
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            piece
                .parse::<i64>()
                .map_err(|_| type_error(param, "array of integers", token))
        })
        .collect()
}

fn int_array(values: Vec<i64>) -> Value {
    Value::Array(values.into_iter().map(Value::from).collect())
}
