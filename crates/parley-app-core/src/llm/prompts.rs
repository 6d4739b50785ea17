//! System prompts.

use parley_types::DocumentKind;
use parley_types::models::is_reasoning_model;

pub const REGULAR_PROMPT: &str =
    "You are a friendly assistant! Keep your responses concise and helpful.";

pub const ARTIFACTS_PROMPT: &str = "\
Artifacts is a side panel next to the conversation that shows documents \
while they are written. Use `createDocument` for substantial content (more \
than ten lines, code, or text the user is likely to save or reuse) and \
`updateDocument` to change a document the user asked you to revise. Do not \
update a document right after creating it; wait for feedback first. Use \
`queryDatabase` when the user asks about their own uploaded documents and \
`getWeather` for weather questions.";

pub const TITLE_PROMPT: &str = "\
Generate a short title for a conversation based on the first message the \
user sent. The title must be at most 80 characters long, must summarise the \
message, and must not contain quotes or colons. Reply with the title only.";

pub const CODE_PROMPT: &str = "\
You write self-contained, runnable code snippets. Prefer the standard \
library, print results so they are visible, keep snippets under 15 lines \
and add short comments where they help. Do not read input or files.";

pub const SHEET_PROMPT: &str = "\
You create spreadsheets in CSV format. Include a header row with \
meaningful column names and realistic data.";

pub const SUGGESTIONS_PROMPT: &str = "\
You are a writing assistant. Given a piece of writing, offer at most 5 \
suggestions to improve it. Each suggestion must change a full sentence, not \
single words. Reply with a JSON array of objects with the string fields \
originalSentence, suggestedSentence and description, and nothing else.";

/// System prompt for the turn. Reasoning models do not get tools, so the
/// tool guidance is left out for them.
pub fn system_prompt(selected_chat_model: &str) -> String {
    if is_reasoning_model(selected_chat_model) {
        REGULAR_PROMPT.to_owned()
    } else {
        format!("{REGULAR_PROMPT}\n\n{ARTIFACTS_PROMPT}")
    }
}

/// System prompt used when writing a new document of `kind`.
pub fn create_document_prompt(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Text => "Write about the given topic. Markdown is supported. Use headings wherever appropriate.",
        DocumentKind::Code => CODE_PROMPT,
        DocumentKind::Sheet => SHEET_PROMPT,
    }
}

/// System prompt used when revising an existing document.
pub fn update_document_prompt(current: &str, kind: DocumentKind) -> String {
    let what = match kind {
        DocumentKind::Text => "document",
        DocumentKind::Code => "code snippet",
        DocumentKind::Sheet => "spreadsheet",
    };
    format!("Improve the following contents of the {what} based on the given prompt.\n\n{current}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_models_get_no_tool_guidance() {
        assert_eq!(system_prompt("chat-model-reasoning"), REGULAR_PROMPT);
        assert!(system_prompt("chat-model").contains("createDocument"));
    }
}
