use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::core::errors::ApiError;
use crate::session::{MessageRole, SessionMessage};

const INPUT: &str = "{input}";
const CHAT_HISTORY: &str = "{chat_history}";
const AGENT_SCRATCHPAD: &str = "{agent_scratchpad}";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant for a newsroom. \
Answer using the news_retriever tool for questions about articles, headlines or summaries, \
and the guideline_retriever tool for questions about editorial standards and practices. \
If the tools return nothing relevant, say so instead of guessing.

Conversation so far:
{chat_history}

Question: {input}

{agent_scratchpad}";

/// One completed tool step, rendered into `{agent_scratchpad}`.
#[derive(Debug, Clone)]
pub struct ScratchpadEntry {
    pub tool: String,
    pub tool_input: Value,
    pub observation: String,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, ApiError> {
        let template = template.into();
        if !template.contains(INPUT) {
            return Err(ApiError::BadRequest(
                "System prompt template must contain the {input} placeholder".to_string(),
            ));
        }
        Ok(Self { template })
    }

    /// Reads the template from disk, using the built-in one when the file is
    /// missing or empty.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        match fs::read_to_string(path) {
            Ok(contents) if !contents.trim().is_empty() => Self::new(contents),
            Ok(_) => {
                tracing::warn!("System prompt {} is empty; using built-in prompt", path.display());
                Self::new(DEFAULT_SYSTEM_PROMPT)
            }
            Err(err) => {
                tracing::warn!(
                    "System prompt {} not readable ({}); using built-in prompt",
                    path.display(),
                    err
                );
                Self::new(DEFAULT_SYSTEM_PROMPT)
            }
        }
    }

    pub fn render(&self, input: &str, history: &[SessionMessage], scratchpad: &[ScratchpadEntry]) -> String {
        let history_text = format_chat_history(history);
        let scratchpad_text = format_scratchpad(scratchpad);

        let mut rendered = substitute(
            &self.template,
            &[
                (INPUT, input),
                (CHAT_HISTORY, &history_text),
                (AGENT_SCRATCHPAD, &scratchpad_text),
            ],
        );

        if !self.template.contains(AGENT_SCRATCHPAD) && !scratchpad_text.is_empty() {
            rendered.push_str("\n\n");
            rendered.push_str(&scratchpad_text);
        }

        rendered
    }
}

/// Replaces placeholders in one left-to-right pass, so placeholder-like text
/// inside substituted values is left alone.
fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while let Some(pos) = rest.find('{') {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        for (placeholder, value) in vars {
            if tail.starts_with(placeholder) {
                output.push_str(value);
                rest = &tail[placeholder.len()..];
                continue 'scan;
            }
        }
        output.push('{');
        rest = &tail[1..];
    }

    output.push_str(rest);
    output
}

fn format_chat_history(history: &[SessionMessage]) -> String {
    history
        .iter()
        .map(|message| {
            let speaker = match message.role {
                MessageRole::Human => "Human",
                MessageRole::Ai => "AI",
            };
            format!("{}: {}", speaker, message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_scratchpad(entries: &[ScratchpadEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "Invoked `{}` with {}\nObservation:\n{}",
                entry.tool, entry.tool_input, entry.observation
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
