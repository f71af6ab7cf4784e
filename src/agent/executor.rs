// Tool-calling agent loop
// Re-renders the prompt with the scratchpad on every step until the model
// answers without nominating a tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::prompt::{PromptTemplate, ScratchpadEntry};
use super::trace::{Observation, ToolInvocationRecord, ToolName};
use crate::core::errors::ApiError;
use crate::llm::{AssistantTurn, ChatMessage, ChatRequest, LlmProvider, ToolCall};
use crate::session::SessionMessage;
use crate::tools::{render_documents, ToolKind, ToolRegistry};

pub const MAX_STEPS_MESSAGE: &str = "Agent stopped due to max iterations.";

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub output: String,
    pub intermediate_steps: Vec<ToolInvocationRecord>,
}

#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, input: &str, history: &[SessionMessage]) -> Result<AgentOutcome, ApiError>;
}

pub struct ToolCallingAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: Option<f64>,
    prompt: PromptTemplate,
    tools: ToolRegistry,
    max_steps: usize,
}

impl ToolCallingAgent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        prompt: PromptTemplate,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            prompt,
            tools,
            max_steps: 6,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    async fn invoke_tool(&self, call: &ToolCall) -> (ToolInvocationRecord, String) {
        let tool = ToolName::parse(&call.name);

        let tool_input = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(value) => value,
            Err(err) => {
                let text = format!("Invalid arguments for `{}`: {}", call.name, err);
                tracing::warn!("{}", text);
                let record = ToolInvocationRecord::new(
                    tool,
                    Value::String(call.arguments.clone()),
                    argument_error(&text),
                );
                return (record, text);
            }
        };

        let kind = match &tool {
            ToolName::Known(kind) => *kind,
            ToolName::Unrecognized(name) => {
                let known: Vec<&str> = ToolKind::ALL.iter().map(|k| k.as_str()).collect();
                let text = format!(
                    "{} is not a valid tool, try one of [{}].",
                    name,
                    known.join(", ")
                );
                tracing::warn!("Model nominated unknown tool `{}`", name);
                let record = ToolInvocationRecord::new(tool, tool_input, Observation::RawText(text.clone()));
                return (record, text);
            }
        };

        let query = tool_input
            .get("query")
            .and_then(|v| v.as_str())
            .or_else(|| tool_input.as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        if query.is_empty() {
            let text = format!("Tool `{}` requires a non-empty `query` argument", kind);
            let record = ToolInvocationRecord::new(tool, tool_input, argument_error(&text));
            return (record, text);
        }

        match self.tools.get(kind).search(&query).await {
            Ok(documents) => {
                let text = render_documents(&documents);
                let record = ToolInvocationRecord::new(tool, tool_input, Observation::from_documents(documents));
                (record, text)
            }
            Err(err) => {
                tracing::warn!("Tool `{}` failed: {}", kind, err);
                let text = format!("Tool `{}` failed: {}", kind, err);
                let record = ToolInvocationRecord::new(tool, tool_input, Observation::RawText(text.clone()));
                (record, text)
            }
        }
    }
}

#[async_trait]
impl AgentRunner for ToolCallingAgent {
    async fn run(&self, input: &str, history: &[SessionMessage]) -> Result<AgentOutcome, ApiError> {
        let mut intermediate_steps = Vec::new();
        let mut scratchpad = Vec::new();

        for step in 0..self.max_steps {
            let prompt = self.prompt.render(input, history, &scratchpad);
            let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
                .with_tools(self.tools.specs())
                .with_temperature(self.temperature);

            match self.provider.complete(request, &self.model).await? {
                AssistantTurn::Final(content) => {
                    tracing::debug!(
                        "Agent finished after {} step(s) with {} tool call(s)",
                        step + 1,
                        intermediate_steps.len()
                    );
                    return Ok(AgentOutcome {
                        output: content,
                        intermediate_steps,
                    });
                }
                AssistantTurn::ToolCalls(calls) => {
                    for call in calls {
                        tracing::info!("Executing tool `{}` (step {}/{})", call.name, step + 1, self.max_steps);
                        let (record, observation_text) = self.invoke_tool(&call).await;
                        tracing::debug!("Tool `{}` produced a {} observation", call.name, record.observation.kind());
                        scratchpad.push(ScratchpadEntry {
                            tool: call.name.clone(),
                            tool_input: record.tool_input.clone(),
                            observation: observation_text,
                        });
                        intermediate_steps.push(record);
                    }
                }
            }
        }

        tracing::warn!("Agent reached the maximum of {} steps without a final answer", self.max_steps);
        Ok(AgentOutcome {
            output: MAX_STEPS_MESSAGE.to_string(),
            intermediate_steps,
        })
    }
}

/// Observation for a call whose arguments could not be used. No search ran,
/// so it carries no documents and is not treated as a degraded retrieval.
fn argument_error(message: &str) -> Observation {
    Observation::Other(json!({ "error": message }))
}
