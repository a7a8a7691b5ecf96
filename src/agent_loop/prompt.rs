//! Prompt composition: instruction preamble, tool catalog and running query.
//!
//! Everything here is a pure function of its inputs, so the same tools and
//! transcript always produce the same prompt text.

use crate::tools::ToolDescriptor;

use super::types::IterationRecord;

const FUNCTION_CALL_FORMAT: &str = "FUNCTION_CALL: function_name|param1|param2|...";
const FINAL_ANSWER_FORMAT: &str = "FINAL_ANSWER: [your_answer]";
const NEXT_ACTION: &str = "  What should I do next?";

/// Extra output shape listed between function calls and final answers.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSection {
    pub title: String,
    pub lines: Vec<String>,
}

/// Fixed instruction text surrounding the tool catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    /// Opening sentence(s) describing the agent's role.
    pub role: String,
    pub extra_formats: Vec<FormatSection>,
    pub guidance: Vec<String>,
    pub examples: Vec<String>,
}

impl PromptTemplate {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            extra_formats: Vec::new(),
            guidance: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn format_section(mut self, title: impl Into<String>, lines: &[&str]) -> Self {
        self.extra_formats.push(FormatSection {
            title: title.into(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        });
        self
    }

    pub fn guidance(mut self, line: impl Into<String>) -> Self {
        self.guidance.push(line.into());
        self
    }

    pub fn example(mut self, line: impl Into<String>) -> Self {
        self.examples.push(line.into());
        self
    }

    /// Preamble with the rendered catalog embedded.
    pub fn system_prompt(&self, tools: &[ToolDescriptor]) -> String {
        let mut out = String::new();
        out.push_str(&self.role);
        out.push_str("\n\nAvailable tools:\n");
        out.push_str(&render_catalog(tools));
        out.push_str(
            "\n\nYou must respond with EXACTLY ONE line in one of these formats (no additional text):\n",
        );

        let mut sections = vec![("For function calls".to_string(), vec![FUNCTION_CALL_FORMAT.to_string()])];
        sections.extend(
            self.extra_formats
                .iter()
                .map(|s| (s.title.clone(), s.lines.clone())),
        );
        sections.push(("For final answers".to_string(), vec![FINAL_ANSWER_FORMAT.to_string()]));

        let rendered: Vec<String> = sections
            .iter()
            .enumerate()
            .map(|(i, (title, lines))| {
                let body: Vec<String> = lines.iter().map(|l| format!("   {l}")).collect();
                format!("{}. {}:\n{}", i + 1, title, body.join("\n"))
            })
            .collect();
        out.push_str(&rendered.join("\n\n"));

        if !self.guidance.is_empty() {
            out.push_str("\n\nImportant:\n");
            out.push_str(&bulleted(&self.guidance));
        }
        if !self.examples.is_empty() {
            out.push_str("\n\nExamples:\n");
            out.push_str(&bulleted(&self.examples));
        }
        out
    }
}

fn bulleted(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("- {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One numbered line per tool: `1. name(param: type, ...) - description`.
pub fn render_catalog(tools: &[ToolDescriptor]) -> String {
    tools
        .iter()
        .enumerate()
        .map(|(i, tool)| format!("{}. {}", i + 1, tool.signature()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The goal alone on the first iteration, then the goal followed by every
/// recorded call summary and a request for the next action.
pub fn running_query(goal: &str, transcript: &[IterationRecord]) -> String {
    if transcript.is_empty() {
        return goal.to_string();
    }
    let summaries: Vec<String> = transcript.iter().map(IterationRecord::summary).collect();
    format!("{goal}\n\n{}{NEXT_ACTION}", summaries.join(" "))
}

/// Full prompt for one completion request.
pub fn compose(
    template: &PromptTemplate,
    tools: &[ToolDescriptor],
    goal: &str,
    transcript: &[IterationRecord],
) -> String {
    format!(
        "{}\n\nQuery: {}",
        template.system_prompt(tools),
        running_query(goal, transcript)
    )
}
