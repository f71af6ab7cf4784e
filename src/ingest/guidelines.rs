use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::html::{extract_sections, Section};
use super::report::{BatchReport, ItemOutcome};
use crate::core::errors::ApiError;
use crate::rag::{DocumentMetadata, GuidelineMetadata, TextSplitter, VectorCollection};

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ApiError>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ApiError> {
        let response = self.client.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::Timeout(format!("fetching {}", url))
            } else {
                ApiError::ServiceUnavailable(format!("fetching {}: {}", url, err))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::ServiceUnavailable(format!("{} returned {}", url, status)));
        }

        response.text().await.map_err(ApiError::internal)
    }
}

/// Trimmed, non-blank lines with duplicates removed; first occurrence wins.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !urls.iter().any(|existing| existing == line) {
            urls.push(line.to_string());
        }
    }
    urls
}

pub fn read_url_list(path: &Path) -> Result<Vec<String>, ApiError> {
    let contents = fs::read_to_string(path)
        .map_err(|err| ApiError::BadRequest(format!("Failed to read {}: {}", path.display(), err)))?;
    Ok(parse_url_list(&contents))
}

pub struct GuidelineIngestor {
    collection: Arc<VectorCollection>,
    fetcher: Arc<dyn PageFetcher>,
    splitter: TextSplitter,
}

impl GuidelineIngestor {
    pub fn new(
        collection: Arc<VectorCollection>,
        fetcher: Arc<dyn PageFetcher>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            collection,
            fetcher,
            splitter: TextSplitter::new(chunk_size, chunk_overlap),
        }
    }

    pub async fn ingest_urls(&self, urls: &[String]) -> BatchReport {
        let mut report = BatchReport::new();
        for (index, url) in urls.iter().enumerate() {
            tracing::info!("[{}/{}] Processing {}", index + 1, urls.len(), url);
            let outcome = self.ingest_page(url).await;
            report.record(url.clone(), outcome);
        }
        report
    }

    pub async fn ingest_page(&self, url: &str) -> ItemOutcome {
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(err) => return ItemOutcome::failed(err),
        };

        let sections = extract_sections(&html);
        if sections.is_empty() {
            return ItemOutcome::skipped("no extractable sections");
        }
        tracing::debug!("{}: {} section(s)", url, sections.len());

        let documents = self.section_chunks(url, sections);
        match self.collection.upsert(documents).await {
            Ok(written) => ItemOutcome::Ingested { chunks: written },
            Err(err) => ItemOutcome::failed(err),
        }
    }

    /// One document per section; long sections are split, and every chunk
    /// of a section shares its `doc_id`.
    fn section_chunks(&self, url: &str, sections: Vec<Section>) -> Vec<(String, DocumentMetadata)> {
        let mut documents = Vec::new();
        for section in sections {
            let metadata = DocumentMetadata::Guideline(GuidelineMetadata {
                doc_id: Uuid::new_v4().to_string(),
                section_title: section.title,
                source_url: url.to_string(),
            });
            for chunk in self.splitter.split(&section.content) {
                documents.push((chunk, metadata.clone()));
            }
        }
        documents
    }
}
