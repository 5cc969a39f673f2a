// file: src/database/memory.rs
// description: in-process vector store with brute-force cosine search
// reference: internal storage patterns

use super::{VectorStore, rank};
use crate::config::StorageBackend;
use crate::error::Result;
use crate::models::{SearchResult, VectorRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, VectorRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    async fn init(&self) -> Result<()> {
        debug!("MemoryStore initialized");
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        debug!("Upserted {} records", records.len());
        Ok(records.len())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let store = self.records.read().await;
        Ok(rank(store.values(), query, limit))
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<usize> {
        let mut store = self.records.write().await;
        let before = store.len();
        store.retain(|_, record| !record.is_chunk_of(document_id));
        Ok(before - store.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::record;

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let store = MemoryStore::new();
        store.upsert(&[record("doc", vec![1.0, 0.0])]).await.unwrap();
        store.upsert(&[record("doc", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.get("doc").await.unwrap().unwrap();
        assert_eq!(stored.vector, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_search_returns_most_similar_first() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                record("north", vec![0.0, 1.0]),
                record("east", vec![1.0, 0.0]),
                record("northeast", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store.search(&[0.1, 1.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "north");
        assert_eq!(results[1].id, "northeast");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = MemoryStore::new();
        store
            .upsert(&[record("a", vec![1.0]), record("b", vec![1.0])])
            .await
            .unwrap();

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_chunks_keeps_whole_document() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                record("doc", vec![1.0]),
                record("doc#0", vec![1.0]),
                record("doc#1", vec![1.0]),
                record("other#0", vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_chunks("doc").await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get("doc").await.unwrap().is_some());
        assert!(store.get("other#0").await.unwrap().is_some());
        assert_eq!(store.delete_chunks("doc").await.unwrap(), 0);
    }
}
