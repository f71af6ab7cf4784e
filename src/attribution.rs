//! Source attribution for agent answers.
//!
//! Walks the recorded tool invocations of one agent run and turns every
//! document the agent actually looked at into a citation. When a tool's
//! structured result did not survive into the trace (the observation is only
//! the text the model saw), the matching lookup is re-run with the user's
//! original query and its documents are cited instead. That re-run is best
//! effort: it may not return exactly what the agent saw.

use serde::{Deserialize, Serialize};

use crate::agent::trace::{Observation, ObservedItem, ToolInvocationRecord, ToolName};
use crate::rag::{DocumentMetadata, RetrievedDocument};
use crate::tools::{DocumentLookup, ToolKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceCitation {
    News {
        content_id: String,
        content_headline: String,
    },
    Guideline {
        source_url: String,
        section_title: String,
    },
}

impl SourceCitation {
    /// The citation kind follows the tool, not the document. A document whose
    /// metadata belongs to the other kind yields empty fields.
    pub fn from_document(kind: ToolKind, document: &RetrievedDocument) -> Self {
        match kind {
            ToolKind::News => match &document.metadata {
                DocumentMetadata::News(meta) => SourceCitation::News {
                    content_id: meta.content_id.clone(),
                    content_headline: meta.content_headline.clone(),
                },
                DocumentMetadata::Guideline(_) => SourceCitation::News {
                    content_id: String::new(),
                    content_headline: String::new(),
                },
            },
            ToolKind::Guideline => match &document.metadata {
                DocumentMetadata::Guideline(meta) => SourceCitation::Guideline {
                    source_url: meta.source_url.clone(),
                    section_title: meta.section_title.clone(),
                },
                DocumentMetadata::News(_) => SourceCitation::Guideline {
                    source_url: String::new(),
                    section_title: String::new(),
                },
            },
        }
    }
}

/// Citations for every document referenced in `trace`, in trace order and
/// then document order. Never fails.
pub async fn extract_sources(
    trace: &[ToolInvocationRecord],
    news_lookup: &dyn DocumentLookup,
    guideline_lookup: &dyn DocumentLookup,
    original_query: &str,
) -> Vec<SourceCitation> {
    let mut sources = Vec::new();

    for (index, record) in trace.iter().enumerate() {
        let kind = match &record.tool {
            ToolName::Known(kind) => *kind,
            ToolName::Unrecognized(name) => {
                tracing::debug!("Step {}: ignoring unrecognized tool `{}`", index, name);
                continue;
            }
        };

        match &record.observation {
            Observation::Documents(items) => {
                for item in items {
                    match item {
                        ObservedItem::Document(document) => {
                            sources.push(SourceCitation::from_document(kind, document));
                        }
                        ObservedItem::Malformed(value) => {
                            tracing::warn!(
                                "Step {}: skipping malformed document from `{}`: {}",
                                index,
                                kind,
                                value
                            );
                        }
                    }
                }
            }
            Observation::RawText(_) => {
                let lookup = match kind {
                    ToolKind::News => news_lookup,
                    ToolKind::Guideline => guideline_lookup,
                };
                tracing::debug!(
                    "Step {}: `{}` observation is raw text, re-querying with the original question",
                    index,
                    kind
                );
                match lookup.lookup(original_query).await {
                    Ok(documents) => {
                        sources.extend(
                            documents
                                .iter()
                                .map(|document| SourceCitation::from_document(kind, document)),
                        );
                    }
                    Err(err) => {
                        tracing::warn!("Step {}: fallback lookup for `{}` failed: {}", index, kind, err);
                    }
                }
            }
            Observation::Other(value) => {
                tracing::warn!(
                    "Step {}: unexpected observation shape from `{}`: {}",
                    index,
                    kind,
                    value
                );
            }
        }
    }

    sources
}
