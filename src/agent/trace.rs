//! Recorded tool invocations from one agent run.

use serde_json::Value;

use crate::rag::RetrievedDocument;
use crate::tools::ToolKind;

#[derive(Debug, Clone, PartialEq)]
pub enum ToolName {
    Known(ToolKind),
    Unrecognized(String),
}

impl ToolName {
    pub fn parse(name: &str) -> Self {
        match ToolKind::from_name(name) {
            Some(kind) => ToolName::Known(kind),
            None => ToolName::Unrecognized(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ToolName::Known(kind) => kind.as_str(),
            ToolName::Unrecognized(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObservedItem {
    Document(RetrievedDocument),
    Malformed(Value),
}

/// What a tool handed back to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Structured result, one entry per returned element.
    Documents(Vec<ObservedItem>),
    /// Unstructured text: the structured result was not captured upstream.
    RawText(String),
    Other(Value),
}

impl Observation {
    pub fn from_documents(documents: Vec<RetrievedDocument>) -> Self {
        Observation::Documents(documents.into_iter().map(ObservedItem::Document).collect())
    }

    /// Classifies an arbitrary JSON observation: arrays become documents
    /// (element by element), strings raw text, everything else `Other`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Observation::Documents(
                items
                    .into_iter()
                    .map(|item| match RetrievedDocument::from_value(&item) {
                        Some(doc) => ObservedItem::Document(doc),
                        None => ObservedItem::Malformed(item),
                    })
                    .collect(),
            ),
            Value::String(text) => Observation::RawText(text),
            other => Observation::Other(other),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Observation::Documents(_) => "documents",
            Observation::RawText(_) => "raw_text",
            Observation::Other(_) => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationRecord {
    pub tool: ToolName,
    pub tool_input: Value,
    pub observation: Observation,
}

impl ToolInvocationRecord {
    pub fn new(tool: ToolName, tool_input: Value, observation: Observation) -> Self {
        Self {
            tool,
            tool_input,
            observation,
        }
    }

    /// Rebuilds a record from a persisted `{tool, tool_input, observation}`
    /// object. A missing tool name counts as unrecognized.
    pub fn from_value(value: &Value) -> Self {
        let tool = value
            .get("tool")
            .and_then(|v| v.as_str())
            .map(ToolName::parse)
            .unwrap_or_else(|| ToolName::Unrecognized(String::new()));
        let tool_input = value.get("tool_input").cloned().unwrap_or(Value::Null);
        let observation = Observation::from_value(value.get("observation").cloned().unwrap_or(Value::Null));

        Self {
            tool,
            tool_input,
            observation,
        }
    }
}
