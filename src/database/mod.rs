// file: src/database/mod.rs
// description: vector store trait, backends and store selection
// reference: internal module structure

pub mod client;
pub mod firestore;
pub mod insert;
pub mod json_store;
pub mod lance_store;
pub mod memory;
pub mod schema;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::models::{SearchResult, VectorRecord};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

pub use client::LanceDbClient;
pub use firestore::FirestoreStore;
pub use insert::{BatchInserter, InsertStats};
pub use json_store::JsonFileStore;
pub use lance_store::LanceDbStore;
pub use memory::MemoryStore;
pub use schema::SchemaManager;

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn backend(&self) -> StorageBackend;

    async fn init(&self) -> Result<()>;

    /// Inserts the records, replacing any stored record with the same id.
    /// Returns the number written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Most similar records first.
    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Removes every chunk record of `document_id`, keeping a whole-document
    /// record stored under that id. Returns the number removed.
    async fn delete_chunks(&self, document_id: &str) -> Result<usize>;

    async fn count(&self) -> Result<usize>;

    async fn clear(&self) -> Result<()>;
}

/// Connects and initializes the configured backend; `None` when persistence
/// is disabled.
pub async fn build_store(config: &StorageConfig) -> Result<Option<Arc<dyn VectorStore>>> {
    let store: Arc<dyn VectorStore> = match config.backend {
        StorageBackend::None => {
            info!("Vector persistence disabled");
            return Ok(None);
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::LanceDb => Arc::new(
            LanceDbStore::new(&config.uri, &config.table_name, config.batch_size).await?,
        ),
        StorageBackend::Json => Arc::new(JsonFileStore::new(config.vector_dir.clone())),
        StorageBackend::Firestore => Arc::new(FirestoreStore::from_config(&config.firestore)?),
    };

    store.init().await?;
    info!("Vector store ready: {}", store.backend().as_str());
    Ok(Some(store))
}

/// Cosine similarity; 0.0 for vectors of different length or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Brute-force ranking shared by the stores without a native index.
/// Ties are broken by id so results are stable.
pub(crate) fn rank<'a>(
    records: impl IntoIterator<Item = &'a VectorRecord>,
    query: &[f32],
    limit: usize,
) -> Vec<SearchResult> {
    let mut scored: Vec<(f32, &VectorRecord)> = records
        .into_iter()
        .map(|record| (cosine_similarity(query, &record.vector), record))
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(score, record)| SearchResult::from_record(record, score, None))
        .collect()
}
