use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Ingested { chunks: usize },
    Skipped { reason: String },
    Failed { error: String },
}

impl ItemOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        ItemOutcome::Skipped { reason: reason.into() }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        ItemOutcome::Failed {
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub item: String,
    pub outcome: ItemOutcome,
}

/// Per-item outcomes of one ingestion run, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, item: impl Into<String>, outcome: ItemOutcome) {
        let item = item.into();
        match &outcome {
            ItemOutcome::Ingested { chunks } => tracing::info!("{}: ingested {} chunk(s)", item, chunks),
            ItemOutcome::Skipped { reason } => tracing::warn!("{}: skipped ({})", item, reason),
            ItemOutcome::Failed { error } => tracing::error!("{}: failed: {}", item, error),
        }
        self.items.push(ItemReport { item, outcome });
    }

    pub fn items(&self) -> &[ItemReport] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ingested(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Ingested { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn total_chunks(&self) -> usize {
        self.items
            .iter()
            .map(|report| match report.outcome {
                ItemOutcome::Ingested { chunks } => chunks,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|report| predicate(&report.outcome)).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} item(s): {} ingested ({} chunks), {} skipped, {} failed",
            self.len(),
            self.ingested(),
            self.total_chunks(),
            self.skipped(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_summary() {
        let mut report = BatchReport::new();
        report.record("a", ItemOutcome::Ingested { chunks: 3 });
        report.record("b", ItemOutcome::skipped("missing body"));
        report.record("c", ItemOutcome::failed("embedding service down"));
        report.record("d", ItemOutcome::Ingested { chunks: 1 });

        assert_eq!(report.ingested(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.total_chunks(), 4);
        assert_eq!(
            report.to_string(),
            "4 item(s): 2 ingested (4 chunks), 1 skipped, 1 failed"
        );
        assert_eq!(report.items()[1].item, "b");
    }

    #[test]
    fn outcomes_serialize_with_status_tag() {
        let value = serde_json::to_value(ItemOutcome::skipped("no extractable sections")).unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["reason"], "no extractable sections");
    }
}
