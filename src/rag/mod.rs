//! Vector collections for the two retrieval sources.
//!
//! - `VectorCollection`: embed-and-store / embed-and-search facade
//! - `RagStore` + `SqliteRagStore`: chunk storage with cosine search
//! - `TextSplitter`: overlapping character windows for ingestion
//! - typed `RetrievedDocument` metadata shared by tools and attribution

pub mod collection;
pub mod document;
pub mod splitter;
pub mod sqlite;
pub mod store;

pub use collection::{ScoredDocument, VectorCollection};
pub use document::{DocumentMetadata, GuidelineMetadata, NewsMetadata, RetrievedDocument};
pub use splitter::TextSplitter;
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoredChunk};
