//! Typed documents as they come back from a vector collection.
//!
//! Metadata is tagged by `document_type`, so a stored chunk is always
//! attributable to exactly one source kind. Individual fields default to
//! empty when absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const NEWS_DOCUMENT_TYPE: &str = "news_article";
pub const GUIDELINE_DOCUMENT_TYPE: &str = "editorial_guideline";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsMetadata {
    #[serde(deserialize_with = "lenient_string")]
    pub content_id: String,
    pub content_headline: String,
    pub content_type: String,
    pub content_publish_time: String,
    pub content_last_update: String,
    #[serde(deserialize_with = "lenient_string")]
    pub content_word_count: String,
    pub content_department_path: String,
    pub content_categories: Vec<String>,
    pub content_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidelineMetadata {
    pub doc_id: String,
    pub section_title: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "document_type")]
pub enum DocumentMetadata {
    #[serde(rename = "news_article")]
    News(NewsMetadata),
    #[serde(rename = "editorial_guideline")]
    Guideline(GuidelineMetadata),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

impl RetrievedDocument {
    pub fn news(page_content: impl Into<String>, metadata: NewsMetadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: DocumentMetadata::News(metadata),
        }
    }

    pub fn guideline(page_content: impl Into<String>, metadata: GuidelineMetadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: DocumentMetadata::Guideline(metadata),
        }
    }

    /// Parses a `{page_content, metadata}` object. Returns `None` for anything
    /// that is not a well-formed document.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn as_news(&self) -> Option<&NewsMetadata> {
        match &self.metadata {
            DocumentMetadata::News(meta) => Some(meta),
            DocumentMetadata::Guideline(_) => None,
        }
    }

    pub fn as_guideline(&self) -> Option<&GuidelineMetadata> {
        match &self.metadata {
            DocumentMetadata::Guideline(meta) => Some(meta),
            DocumentMetadata::News(_) => None,
        }
    }
}

/// Accepts strings and numbers (identifiers are sometimes numeric in source
/// data); null becomes empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}
