//! Built-in scenarios: prompt text, default goal, tool server and follow-up.

use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use strum::{Display, EnumString};

use crate::config::PilotConfig;
use crate::error::Result;
use crate::mcp::ServerSpec;
use crate::tools::ToolArguments;

use super::coerce::EXPONENTIAL_SUM_TOOL;
use super::prompt::PromptTemplate;

pub const EMAIL_READY_MARKER: &str = "SERVER_READY";
const RESULT_PLACEHOLDER: &str = "{result}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ScenarioKind {
    Paint,
    Email,
}

/// One tool call made by the loop itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpStep {
    pub tool: String,
    /// Argument object; `{result}` inside string values is replaced with the
    /// rendered trigger result.
    pub arguments: Value,
    pub pause_after: Option<Duration>,
}

impl FollowUpStep {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            pause_after: None,
        }
    }

    pub fn pause_after(mut self, pause: Duration) -> Self {
        self.pause_after = Some(pause);
        self
    }

    pub fn arguments_for(&self, result: &str) -> ToolArguments {
        let Value::Object(map) = &self.arguments else {
            return ToolArguments::new();
        };
        map.iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => Value::String(s.replace(RESULT_PLACEHOLDER, result)),
                    other => other.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// Fixed sequence of tool calls run after a trigger tool succeeds; the run
/// then completes with the trigger's result.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub trigger_tool: String,
    pub steps: Vec<FollowUpStep>,
}

impl FollowUp {
    pub fn triggered_by(&self, tool: &str) -> bool {
        self.trigger_tool == tool
    }

    /// Open Paint, frame the result and write it.
    pub fn paint_visualization() -> Self {
        Self {
            trigger_tool: EXPONENTIAL_SUM_TOOL.to_string(),
            steps: vec![
                FollowUpStep::new("open_paint", json!({})).pause_after(Duration::from_secs(1)),
                FollowUpStep::new(
                    "draw_rectangle",
                    json!({"x1": 400, "y1": 300, "x2": 1200, "y2": 600}),
                ),
                FollowUpStep::new("add_text_in_paint", json!({"text": "Result = {result}"})),
            ],
        }
    }
}

/// Everything that differs between the shipped agent setups.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub template: PromptTemplate,
    pub goal: String,
    pub server: ServerSpec,
    pub follow_up: Option<FollowUp>,
}

impl Scenario {
    /// Calculation with the result drawn in Paint.
    pub fn paint() -> Self {
        let template = PromptTemplate::new(
            "You are an AI agent that solves problems and visualizes results in Microsoft Paint. You have access to various tools for calculations and visualization.",
        )
        .format_section(
            "For visualization",
            &[
                "FUNCTION_CALL: open_paint",
                "FUNCTION_CALL: draw_rectangle|x1|y1|x2|y2",
                "FUNCTION_CALL: add_text_in_paint|text",
            ],
        )
        .guidance("When a function returns multiple values, you need to process all of them")
        .guidance("Only give FINAL_ANSWER when you have completed all necessary calculations")
        .guidance("Do not repeat function calls with the same parameters")
        .guidance("When solving a problem that needs visualization: first perform all calculations, then call open_paint, then draw_rectangle for the frame, and finally add_text_in_paint with the result")
        .example("FUNCTION_CALL: add|5|3")
        .example("FUNCTION_CALL: strings_to_chars_to_int|INDIA")
        .example("FUNCTION_CALL: open_paint")
        .example("FUNCTION_CALL: draw_rectangle|400|300|1200|600")
        .example("FUNCTION_CALL: add_text_in_paint|Result = 42");

        Self {
            kind: ScenarioKind::Paint,
            template,
            goal: "Find the ASCII values of characters in INDIA, calculate the sum of exponentials of those values, and visualize the result in Paint.".into(),
            server: ServerSpec::new("python", vec!["example2.py".into()]),
            follow_up: Some(FollowUp::paint_visualization()),
        }
    }

    /// Calculation with the result mailed to the configured recipient.
    pub fn email(creds_file: &Path, token_file: &Path) -> Self {
        let template = PromptTemplate::new(
            "You are an AI agent that solves problems and performs calculations. You have access to various tools for calculations and email sending.",
        )
        .guidance("When solving a problem that needs multiple steps: first perform all calculations, then send email with the results if requested")
        .guidance("When a function returns multiple values, process all of them")
        .guidance("Do not repeat function calls with the same parameters")
        .example("FUNCTION_CALL: strings_to_chars_to_int|INDIA")
        .example("FUNCTION_CALL: int_list_to_exponential_sum|[73, 78, 68, 73, 65]")
        .example("FUNCTION_CALL: send-email|recipient_id|subject|message");

        let server = ServerSpec::new(
            "python",
            vec![
                "-u".into(),
                "server.py".into(),
                "--creds-file-path".into(),
                creds_file.display().to_string(),
                "--token-path".into(),
                token_file.display().to_string(),
            ],
        )
        .with_ready_marker(EMAIL_READY_MARKER);

        Self {
            kind: ScenarioKind::Email,
            template,
            goal: "Find the ASCII values of characters in INDIA, calculate the sum of exponentials of those values, and send the results via email.".into(),
            server,
            follow_up: None,
        }
    }

    /// Build a scenario and apply server overrides and timeouts from config.
    ///
    /// The email scenario checks its credential files first.
    pub fn from_config(kind: ScenarioKind, config: &PilotConfig) -> Result<Self> {
        let mut scenario = match kind {
            ScenarioKind::Paint => Self::paint(),
            ScenarioKind::Email => {
                let (creds, token) = config.validate_email_credentials()?;
                Self::email(creds, token)
            }
        };

        if let Some(command) = &config.server_command {
            scenario.server.command = command.clone();
            scenario.server.args = config.server_args.clone();
        }
        scenario.server.startup_timeout = config.startup_timeout;
        Ok(scenario)
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PilotError;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn scenario_kind_parses_lowercase_names() {
        assert_eq!("paint".parse::<ScenarioKind>().unwrap(), ScenarioKind::Paint);
        assert_eq!("email".parse::<ScenarioKind>().unwrap(), ScenarioKind::Email);
        assert!("fax".parse::<ScenarioKind>().is_err());
        assert_eq!(ScenarioKind::Email.to_string(), "email");
    }

    #[test]
    fn paint_follow_up_fills_in_result() {
        let follow_up = FollowUp::paint_visualization();
        assert!(follow_up.triggered_by(EXPONENTIAL_SUM_TOOL));
        let tools: Vec<_> = follow_up.steps.iter().map(|s| s.tool.as_str()).collect();
        assert_eq!(tools, ["open_paint", "draw_rectangle", "add_text_in_paint"]);

        let text = follow_up.steps[2].arguments_for("[7.5e+33]");
        assert_eq!(text["text"], json!("Result = [7.5e+33]"));
        let rect = follow_up.steps[1].arguments_for("ignored");
        assert_eq!(Value::Object(rect), json!({"x1": 400, "y1": 300, "x2": 1200, "y2": 600}));
    }

    #[test]
    fn email_scenario_requires_credentials() {
        let err = Scenario::from_config(ScenarioKind::Email, &PilotConfig::default()).unwrap_err();
        assert!(matches!(err, PilotError::MissingConfiguration { .. }));
    }

    #[test]
    fn email_scenario_passes_credential_paths_to_server() {
        let dir = TempDir::new().unwrap();
        let creds = dir.path().join("credentials.json");
        let token = dir.path().join("token.json");
        std::fs::write(&creds, "{}").unwrap();

        let config = PilotConfig::default().with_credential_files(&creds, &token);
        let scenario = Scenario::from_config(ScenarioKind::Email, &config).unwrap();

        assert_eq!(scenario.server.ready_marker.as_deref(), Some(EMAIL_READY_MARKER));
        assert!(scenario.server.args.contains(&creds.display().to_string()));
        assert!(scenario.follow_up.is_none());
    }

    #[test]
    fn server_override_replaces_default_command() {
        let mut config = PilotConfig::default();
        config.server_command = Some("uv".into());
        config.server_args = vec!["run".into(), "tools.py".into()];
        let scenario = Scenario::from_config(ScenarioKind::Paint, &config).unwrap();
        assert_eq!(scenario.server.display_command(), "uv run tools.py");
        assert!(scenario.server.ready_marker.is_none());
    }
}
