//! Offline batch jobs that fill the two vector collections.

pub mod guidelines;
pub mod html;
pub mod news;
pub mod report;

pub use guidelines::{read_url_list, GuidelineIngestor, HttpPageFetcher, PageFetcher};
pub use news::{read_dataset, NewsIngestor, NewsRecord};
pub use report::{BatchReport, ItemOutcome, ItemReport};
