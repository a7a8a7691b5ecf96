//! Response parsing for the `FUNCTION_CALL:` / `FINAL_ANSWER:` grammar.
//!
//! ```text
//! line         := FUNCTION_CALL ":" name ("|" arg)*
//!               | FINAL_ANSWER ":" text
//! ```

pub const FUNCTION_CALL_PREFIX: &str = "FUNCTION_CALL:";
pub const FINAL_ANSWER_PREFIX: &str = "FINAL_ANSWER:";

/// A command extracted from a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Invoke { tool: String, args: Vec<String> },
    FinalAnswer { text: String },
}

/// Extract commands from a raw completion.
///
/// Every `FUNCTION_CALL:` line is returned in order. A `FINAL_ANSWER:` is
/// only recognized when there are no function calls. An empty vector means
/// the completion was unparseable.
pub fn parse_response(text: &str) -> Vec<Command> {
    let calls: Vec<Command> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(FUNCTION_CALL_PREFIX))
        .filter_map(parse_function_call)
        .collect();
    if !calls.is_empty() {
        return calls;
    }

    parse_final_answer(text.trim())
        .map(|text| vec![Command::FinalAnswer { text }])
        .unwrap_or_default()
}

/// Split `FUNCTION_CALL: name|a|b` into the tool name and trimmed arguments.
pub fn parse_function_call(line: &str) -> Option<Command> {
    let (_, rest) = line.split_once(':')?;
    let mut parts = rest.split('|').map(str::trim);
    let tool = parts.next()?.to_string();
    let args = parts.map(str::to_string).collect();
    Some(Command::Invoke { tool, args })
}

fn parse_final_answer(text: &str) -> Option<String> {
    text.strip_prefix(FINAL_ANSWER_PREFIX)
        .map(|answer| answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn invoke(tool: &str, args: &[&str]) -> Command {
        Command::Invoke {
            tool: tool.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn function_call_tokens_are_trimmed() {
        assert_eq!(
            parse_response("FUNCTION_CALL:  add | 5 |3 "),
            vec![invoke("add", &["5", "3"])]
        );
    }

    #[test]
    fn call_without_arguments() {
        assert_eq!(parse_response("FUNCTION_CALL: open_paint"), vec![invoke("open_paint", &[])]);
    }

    #[test]
    fn all_function_call_lines_are_collected_in_order() {
        let text = "Let me think.\nFUNCTION_CALL: strings_to_chars_to_int|INDIA\n  FUNCTION_CALL: int_list_to_exponential_sum|73|78\nFINAL_ANSWER: [1]";
        assert_eq!(
            parse_response(text),
            vec![
                invoke("strings_to_chars_to_int", &["INDIA"]),
                invoke("int_list_to_exponential_sum", &["73", "78"]),
            ]
        );
    }

    #[test]
    fn final_answer_when_no_function_calls() {
        assert_eq!(
            parse_response("  FINAL_ANSWER: [7.59982224609308e+33]\n"),
            vec![Command::FinalAnswer {
                text: "[7.59982224609308e+33]".into()
            }]
        );
    }

    #[test]
    fn final_answer_must_lead_the_completion() {
        assert!(parse_response("The answer is\nFINAL_ANSWER: 5").is_empty());
    }

    #[test]
    fn prose_yields_no_commands() {
        assert!(parse_response("I am not sure what to do.").is_empty());
        assert!(parse_response("").is_empty());
    }

    #[test]
    fn colons_inside_arguments_survive() {
        assert_eq!(
            parse_response("FUNCTION_CALL: send-email|recipient_id|Result: sum|body"),
            vec![invoke("send-email", &["recipient_id", "Result: sum", "body"])]
        );
    }
}
