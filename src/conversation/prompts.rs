//! System and compression prompts, and transcript formatting for summaries.

use crate::types::Message;

const CORE_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to various tools.

# Operational Guidelines

## Tone and Style
- Be concise and direct in your responses
- Focus on being helpful and accurate
- Use tools when appropriate to accomplish tasks

## Tool Usage
- You have access to various tools that can help you accomplish tasks
- Always validate tool parameters before use
- Provide clear descriptions of what tools will do before execution
";

const COMPRESSION_PROMPT: &str = "Please create a concise summary of the conversation history so far.

Focus on:
- Key topics discussed
- Important decisions made
- Tools used and their outcomes
- Any ongoing context that should be preserved

Provide the summary in a clear, structured format that preserves the essential information while reducing the overall length.";

/// Prefix of the synthetic message that replaces compressed history.
pub const SUMMARY_PREFIX: &str = "Previous conversation summary: ";

/// Core system prompt, with a `# User Context` section when memory is set.
pub fn core_system_prompt(user_memory: Option<&str>) -> String {
    match user_memory.map(str::trim).filter(|m| !m.is_empty()) {
        Some(memory) => format!("{CORE_SYSTEM_PROMPT}\n\n# User Context\n{memory}"),
        None => CORE_SYSTEM_PROMPT.to_string(),
    }
}

pub fn compression_prompt() -> &'static str {
    COMPRESSION_PROMPT
}

/// One `ROLE: text` line per message. Tool calls are rendered inline.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(format_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn format_line(message: &Message) -> Option<String> {
    let mut parts = Vec::new();
    if !message.content.trim().is_empty() {
        parts.push(message.content.trim().to_string());
    }
    for call in &message.tool_calls {
        parts.push(format!("[called {} {}]", call.name, call.arguments));
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "{}: {}",
        message.role.to_string().to_uppercase(),
        parts.join(" ")
    ))
}

/// Full request sent to a model when asking it to summarize `messages`.
pub fn summary_request(messages: &[Message]) -> String {
    format!(
        "Please summarize this conversation history:\n\n{}\n\n{}",
        format_transcript(messages),
        COMPRESSION_PROMPT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;

    #[test]
    fn system_prompt_appends_user_context() {
        let prompt = core_system_prompt(Some("Prefers Rust"));

        assert!(prompt.starts_with("You are a helpful AI assistant"));
        assert!(prompt.ends_with("# User Context\nPrefers Rust"));
        assert!(!core_system_prompt(Some("   ")).contains("User Context"));
        assert!(!core_system_prompt(None).contains("User Context"));
    }

    #[test]
    fn transcript_uses_uppercase_roles_and_skips_empty() {
        let messages = vec![
            Message::user("What is 2+2?"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("c1", "math_calculator", serde_json::json!({"expression": "2+2"}))],
            ),
            Message::tool_result("c1", "4", false),
            Message::assistant(""),
        ];

        let transcript = format_transcript(&messages);

        assert_eq!(
            transcript,
            "USER: What is 2+2?\n\
             ASSISTANT: [called math_calculator {\"expression\":\"2+2\"}]\n\
             TOOL: 4"
        );
    }

    #[test]
    fn summary_request_wraps_transcript() {
        let request = summary_request(&[Message::user("hi")]);

        assert!(request.contains("USER: hi"));
        assert!(request.ends_with(compression_prompt()));
    }
}
