//! Browser message history to provider prompt messages.

use parley_types::{MessagePart, Role, ToolInvocationState, UiMessage};

use crate::llm::{PromptMessage, ToolCall};

/// Convert a history into prompt messages.
///
/// Assistant messages are split at step boundaries: each step becomes an
/// assistant message carrying its text and tool calls, followed by one tool
/// message per call result. Calls that never produced a result are dropped.
pub fn to_prompt(messages: &[UiMessage]) -> Vec<PromptMessage> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::System => out.push(PromptMessage::System { content: message.text() }),
            Role::User => out.push(PromptMessage::User {
                content: message.text(),
                attachments: message.attachments(),
            }),
            Role::Assistant => assistant_steps(&message.content_parts(), &mut out),
            Role::Data => {}
        }
    }
    out
}

fn assistant_steps(parts: &[MessagePart], out: &mut Vec<PromptMessage>) {
    for step in parts.split(|p| matches!(p, MessagePart::StepStart)) {
        let text: String = step.iter().filter_map(MessagePart::as_text).collect();
        let mut calls = Vec::new();
        let mut results = Vec::new();
        for part in step {
            let MessagePart::ToolInvocation { tool_invocation: inv } = part else {
                continue;
            };
            let (ToolInvocationState::Result, Some(result)) = (inv.state, &inv.result) else {
                continue;
            };
            calls.push(ToolCall {
                id: inv.tool_call_id.clone(),
                name: inv.tool_name.clone(),
                arguments: inv.args.to_string(),
            });
            results.push(PromptMessage::Tool {
                tool_call_id: inv.tool_call_id.clone(),
                content: result.to_string(),
            });
        }
        if text.is_empty() && calls.is_empty() {
            continue;
        }
        out.push(PromptMessage::Assistant {
            content: (!text.is_empty()).then_some(text),
            tool_calls: calls,
        });
        out.extend(results);
    }
}
