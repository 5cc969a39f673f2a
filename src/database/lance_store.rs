// file: src/database/lance_store.rs
// description: VectorStore backed by a local LanceDB table
// reference: https://docs.rs/lancedb

use super::VectorStore;
use super::client::{LanceDbClient, quote};
use super::insert::BatchInserter;
use super::schema::SchemaManager;
use crate::config::StorageBackend;
use crate::error::{PipelineError, Result};
use crate::models::{SearchResult, VectorRecord};
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

pub struct LanceDbStore {
    client: LanceDbClient,
    batch_size: usize,
    /// Embedding width of the table, fixed by the first insert.
    dimension: RwLock<Option<usize>>,
    /// Serializes writers so concurrent first inserts do not race on table creation.
    write_lock: Mutex<()>,
}

impl LanceDbStore {
    pub async fn new(uri: &str, table_name: &str, batch_size: usize) -> Result<Self> {
        let client = LanceDbClient::new(uri, table_name).await?;
        Ok(Self {
            client,
            batch_size,
            dimension: RwLock::new(None),
            write_lock: Mutex::new(()),
        })
    }

    pub fn client(&self) -> &LanceDbClient {
        &self.client
    }

    pub async fn dimension(&self) -> Option<usize> {
        *self.dimension.read().await
    }

    fn id_filter(ids: &[&str]) -> String {
        let quoted: Vec<String> = ids.iter().map(|id| quote(id)).collect();
        format!("id IN ({})", quoted.join(", "))
    }

    async fn check_dimension(&self, actual: usize) -> Result<()> {
        match *self.dimension.read().await {
            Some(expected) if expected != actual => {
                Err(PipelineError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for LanceDbStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::LanceDb
    }

    async fn init(&self) -> Result<()> {
        self.client.ping().await?;
        let existing = SchemaManager::new(&self.client).initialize().await?;
        *self.dimension.write().await = existing;
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let _guard = self.write_lock.lock().await;

        let dimension = first.dimension();
        if dimension == 0 {
            return Err(PipelineError::Validation(
                "cannot store an empty vector".to_string(),
            ));
        }
        for record in records {
            self.check_dimension(record.dimension()).await?;
            if record.dimension() != dimension {
                return Err(PipelineError::DimensionMismatch {
                    expected: dimension,
                    actual: record.dimension(),
                });
            }
        }

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        self.client.delete_where(&Self::id_filter(&ids)).await?;

        let stats = BatchInserter::new(&self.client, self.batch_size)
            .insert(records)
            .await?;

        self.dimension.write().await.get_or_insert(dimension);
        debug!(
            "Upserted {} records in {} batches",
            stats.records_inserted, stats.batches
        );
        Ok(stats.records_inserted)
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if self.dimension().await.is_none() {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len()).await?;
        self.client.vector_search(query.to_vec(), limit).await
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let filter = format!("id = {}", quote(id));
        Ok(self.client.find(&filter, 1).await?.into_iter().next())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let filter = format!("id = {}", quote(id));
        if self.client.count_rows(Some(filter.clone())).await? == 0 {
            return Ok(false);
        }
        self.client.delete_where(&filter).await?;
        Ok(true)
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let filter = format!(
            "document_id = {} AND id != {}",
            quote(document_id),
            quote(document_id)
        );
        let removed = self.client.count_rows(Some(filter.clone())).await?;
        if removed > 0 {
            self.client.delete_where(&filter).await?;
            debug!("Removed {} chunks of {}", removed, document_id);
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        self.client.count_rows(None).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        SchemaManager::new(&self.client).drop_all_tables().await?;
        *self.dimension.write().await = None;
        info!("Cleared LanceDB table {}", self.client.table_name());
        Ok(())
    }
}
