// News dataset ingestion
// One JSON array of article records in; one upsert of prefixed body chunks
// per valid record out. Records are not de-duplicated across runs.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use super::report::{BatchReport, ItemOutcome};
use crate::core::errors::ApiError;
use crate::rag::{DocumentMetadata, NewsMetadata, TextSplitter, VectorCollection};

/// A validated article: required fields present and non-blank.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsRecord {
    pub body: String,
    pub metadata: NewsMetadata,
}

impl NewsRecord {
    /// Validates one raw record. The error is the skip reason.
    pub fn parse(value: &Value) -> Result<Self, String> {
        let item = value.as_object().ok_or_else(|| "not an object".to_string())?;

        let content_id = match item.get("content_id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err("missing or empty content_id".to_string()),
        };

        let content_headline = match item.get("content_headline").and_then(Value::as_str) {
            Some(headline) if !headline.trim().is_empty() => headline.to_string(),
            _ => return Err("missing or empty headline".to_string()),
        };

        let body = match item.get("body").and_then(Value::as_str) {
            Some(body) if !body.trim().is_empty() => body.to_string(),
            _ => return Err("empty or whitespace-only body".to_string()),
        };

        let metadata = NewsMetadata {
            content_id,
            content_headline,
            content_type: string_or(item.get("content_type"), "Unknown"),
            content_publish_time: string_or(item.get("content_publish_time"), ""),
            content_last_update: string_or(item.get("content_last_update"), ""),
            content_word_count: string_or(item.get("content_word_count"), "0"),
            content_department_path: string_or(item.get("content_department_path"), ""),
            content_categories: named_entries(item.get("content_categories"), "content_category"),
            content_tags: named_entries(item.get("content_tags"), "name"),
        };

        Ok(Self { body, metadata })
    }

    /// Splits the body and prefixes every chunk with the article identity so
    /// each chunk is self-describing in search results.
    pub fn chunks(&self, splitter: &TextSplitter) -> Vec<(String, DocumentMetadata)> {
        let prefix = format!(
            "Content ID: {}\nHeadline: {}\n",
            self.metadata.content_id, self.metadata.content_headline
        );
        splitter
            .split(&self.body)
            .into_iter()
            .map(|chunk| {
                (
                    format!("{}{}", prefix, chunk),
                    DocumentMetadata::News(self.metadata.clone()),
                )
            })
            .collect()
    }
}

fn string_or(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => default.to_string(),
    }
}

/// `[{key: "..."}, ...]` to the list of strings under `key`; other entries
/// are ignored.
fn named_entries(value: Option<&Value>, key: &str) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get(key).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn read_dataset(path: &Path) -> Result<Vec<Value>, ApiError> {
    let contents = fs::read_to_string(path)
        .map_err(|err| ApiError::BadRequest(format!("Failed to read {}: {}", path.display(), err)))?;
    let parsed: Value = serde_json::from_str(&contents)
        .map_err(|err| ApiError::BadRequest(format!("Invalid JSON in {}: {}", path.display(), err)))?;
    match parsed {
        Value::Array(items) => Ok(items),
        _ => Err(ApiError::BadRequest(format!(
            "{} must contain a JSON array of records",
            path.display()
        ))),
    }
}

pub struct NewsIngestor {
    collection: Arc<VectorCollection>,
    splitter: TextSplitter,
}

impl NewsIngestor {
    pub fn new(collection: Arc<VectorCollection>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            collection,
            splitter: TextSplitter::new(chunk_size, chunk_overlap),
        }
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<BatchReport, ApiError> {
        let records = read_dataset(path)?;
        tracing::info!("Loaded {} record(s) from {}", records.len(), path.display());
        Ok(self.ingest_records(&records).await)
    }

    pub async fn ingest_records(&self, records: &[Value]) -> BatchReport {
        let mut report = BatchReport::new();
        for (index, value) in records.iter().enumerate() {
            let label = record_label(index, value);
            let outcome = self.ingest_record(value).await;
            report.record(label, outcome);
        }
        report
    }

    pub async fn ingest_record(&self, value: &Value) -> ItemOutcome {
        let record = match NewsRecord::parse(value) {
            Ok(record) => record,
            Err(reason) => return ItemOutcome::skipped(reason),
        };

        let chunks = record.chunks(&self.splitter);
        if chunks.is_empty() {
            return ItemOutcome::skipped("body produced no chunks");
        }

        match self.collection.upsert(chunks).await {
            Ok(written) => ItemOutcome::Ingested { chunks: written },
            Err(err) => ItemOutcome::failed(err),
        }
    }
}

fn record_label(index: usize, value: &Value) -> String {
    match value.get("content_id") {
        Some(Value::String(id)) if !id.is_empty() => format!("record #{} (ID={})", index, id),
        Some(Value::Number(id)) => format!("record #{} (ID={})", index, id),
        _ => format!("record #{}", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "content_id": "1.6590078",
            "content_headline": "Budget day",
            "content_type": "story",
            "content_word_count": 812,
            "content_department_path": null,
            "content_categories": [
                { "content_category": "Politics" },
                { "other": "ignored" },
                "not an object"
            ],
            "content_tags": [{ "name": "budget" }, { "name": "ottawa" }],
            "body": "The federal budget lands today. It includes new spending."
        })
    }

    #[test]
    fn parse_fills_defaults_and_lists() {
        let record = NewsRecord::parse(&sample()).unwrap();
        let meta = &record.metadata;
        assert_eq!(meta.content_id, "1.6590078");
        assert_eq!(meta.content_type, "story");
        assert_eq!(meta.content_word_count, "812");
        assert_eq!(meta.content_department_path, "");
        assert_eq!(meta.content_publish_time, "");
        assert_eq!(meta.content_categories, vec!["Politics".to_string()]);
        assert_eq!(meta.content_tags, vec!["budget".to_string(), "ottawa".to_string()]);

        let minimal = NewsRecord::parse(&json!({
            "content_id": 42,
            "content_headline": "H",
            "body": "B"
        }))
        .unwrap();
        assert_eq!(minimal.metadata.content_id, "42");
        assert_eq!(minimal.metadata.content_type, "Unknown");
        assert_eq!(minimal.metadata.content_word_count, "0");
    }

    #[test]
    fn parse_rejects_invalid_records() {
        let cases = vec![
            (json!("text"), "not an object"),
            (json!({ "content_headline": "H", "body": "B" }), "content_id"),
            (json!({ "content_id": "", "content_headline": "H", "body": "B" }), "content_id"),
            (json!({ "content_id": "1", "content_headline": "  ", "body": "B" }), "headline"),
            (json!({ "content_id": "1", "content_headline": "H" }), "body"),
            (json!({ "content_id": "1", "content_headline": "H", "body": " \n\t" }), "body"),
        ];
        for (value, expected) in cases {
            let reason = NewsRecord::parse(&value).unwrap_err();
            assert!(reason.contains(expected), "{} should mention {}", reason, expected);
        }
    }

    #[test]
    fn chunks_carry_identity_prefix() {
        let record = NewsRecord::parse(&sample()).unwrap();
        let chunks = record.chunks(&TextSplitter::new(500, 100));
        assert_eq!(chunks.len(), 1);
        let (text, metadata) = &chunks[0];
        assert!(text.starts_with("Content ID: 1.6590078\nHeadline: Budget day\nThe federal budget"));
        assert!(matches!(metadata, DocumentMetadata::News(meta) if meta.content_headline == "Budget day"));
    }

    #[test]
    fn dataset_must_be_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news-dataset.json");
        fs::write(&path, r#"{"content_id": "1"}"#).unwrap();
        assert!(read_dataset(&path).is_err());
        fs::write(&path, r#"[{"content_id": "1"}, 3]"#).unwrap();
        assert_eq!(read_dataset(&path).unwrap().len(), 2);
        assert!(read_dataset(&dir.path().join("missing.json")).is_err());
    }
}
