// file: src/database/insert.rs
// description: LanceDB batch insertion operations with vector embeddings
// reference: https://docs.rs/lancedb

use crate::database::client::LanceDbClient;
use crate::database::schema::SchemaManager;
use crate::error::{PipelineError, Result};
use crate::models::VectorRecord;
use arrow_array::{
    FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow_schema::Schema;
use std::sync::Arc;
use tracing::{debug, info};

pub struct BatchInserter<'a> {
    client: &'a LanceDbClient,
    batch_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InsertStats {
    pub records_inserted: usize,
    pub batches: usize,
}

impl<'a> BatchInserter<'a> {
    pub fn new(client: &'a LanceDbClient, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
        }
    }

    /// Appends `records`, creating the table on first use. All records must
    /// share one embedding width.
    pub async fn insert(&self, records: &[VectorRecord]) -> Result<InsertStats> {
        let mut stats = InsertStats::default();
        let Some(first) = records.first() else {
            return Ok(stats);
        };

        let schema = SchemaManager::get_documents_schema(first.dimension());
        let table_name = self.client.table_name();

        for batch in records.chunks(self.batch_size) {
            let record_batch = Self::create_record_batch(schema.clone(), batch)?;

            if !self.client.table_exists(table_name).await? {
                self.client
                    .get_connection()
                    .create_table(
                        table_name,
                        RecordBatchIterator::new(vec![Ok(record_batch)], schema.clone()),
                    )
                    .execute()
                    .await
                    .map_err(|e| {
                        PipelineError::Database(format!("Failed to create table: {}", e))
                    })?;
                info!("Created new table: {}", table_name);
            } else {
                let table = self.client.get_table(table_name).await?;
                table
                    .add(RecordBatchIterator::new(vec![Ok(record_batch)], schema.clone()))
                    .execute()
                    .await
                    .map_err(|e| {
                        PipelineError::Database(format!("Failed to insert records: {}", e))
                    })?;
            }

            stats.records_inserted += batch.len();
            stats.batches += 1;
            debug!("Inserted batch of {} records", batch.len());
        }

        Ok(stats)
    }

    /// Create an Arrow RecordBatch from records
    pub fn create_record_batch(
        schema: Arc<Schema>,
        records: &[VectorRecord],
    ) -> Result<RecordBatch> {
        let dimension = records.first().map(VectorRecord::dimension).unwrap_or(0);
        if let Some(bad) = records.iter().find(|r| r.dimension() != dimension) {
            return Err(PipelineError::DimensionMismatch {
                expected: dimension,
                actual: bad.dimension(),
            });
        }

        let ids: StringArray = records.iter().map(|r| Some(r.id.as_str())).collect();
        let document_ids: StringArray = records
            .iter()
            .map(|r| Some(r.document_id.as_str()))
            .collect();
        let file_names: StringArray = records.iter().map(|r| Some(r.file_name.as_str())).collect();
        let kinds: StringArray = records.iter().map(|r| Some(r.kind.extension())).collect();
        let chunk_indexes: UInt32Array = records.iter().map(|r| Some(r.chunk_index)).collect();
        let texts: StringArray = records.iter().map(|r| Some(r.text.as_str())).collect();
        let content_hashes: StringArray = records
            .iter()
            .map(|r| Some(r.content_hash.as_str()))
            .collect();
        let created_ats: Int64Array = records.iter().map(|r| Some(r.created_at)).collect();

        // Build embedding array (FixedSizeList of Float32)
        let embedding_values: Float32Array = records
            .iter()
            .flat_map(|r| r.vector.iter().copied())
            .collect();

        let embedding_list =
            FixedSizeListArray::try_new_from_values(embedding_values, dimension as i32).map_err(
                |e| PipelineError::Database(format!("Failed to create embedding array: {}", e)),
            )?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(document_ids),
                Arc::new(file_names),
                Arc::new(kinds),
                Arc::new(chunk_indexes),
                Arc::new(texts),
                Arc::new(content_hashes),
                Arc::new(created_ats),
                Arc::new(embedding_list),
            ],
        )
        .map_err(|e| PipelineError::Database(format!("Failed to create record batch: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::client::records_from_batch;
    use crate::database::test_support::record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_stats_default() {
        let stats = InsertStats::default();
        assert_eq!(stats.records_inserted, 0);
        assert_eq!(stats.batches, 0);
    }

    #[test]
    fn test_record_batch_conversion() {
        let records = vec![
            record("a#0", vec![0.1, 0.2, 0.3]).with_chunk_index(0),
            record("a#1", vec![0.4, 0.5, 0.6]).with_chunk_index(1),
        ];
        let schema = SchemaManager::get_documents_schema(3);
        let batch = BatchInserter::create_record_batch(schema, &records).unwrap();
        assert_eq!(batch.num_rows(), 2);

        let rows = records_from_batch(&batch).unwrap();
        let decoded: Vec<VectorRecord> = rows.into_iter().map(|(r, _)| r).collect();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let records = vec![record("a", vec![0.1, 0.2]), record("b", vec![0.1])];
        let schema = SchemaManager::get_documents_schema(2);
        assert!(matches!(
            BatchInserter::create_record_batch(schema, &records),
            Err(PipelineError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
