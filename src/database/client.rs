// file: src/database/client.rs
// description: LanceDB client wrapper with connection management
// reference: https://docs.rs/lancedb

use crate::error::{PipelineError, Result};
use crate::extractor::FileKind;
use crate::models::{SearchResult, VectorRecord};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, StringArray, UInt32Array,
};
use futures::StreamExt;
use lancedb::arrow::SendableRecordBatchStream;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table, connect};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct LanceDbClient {
    connection: Connection,
    table_name: String,
}

impl LanceDbClient {
    pub async fn new(uri: &str, table_name: &str) -> Result<Self> {
        info!("Connecting to LanceDB at {}", uri);

        let connection = connect(uri)
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            table_name: table_name.to_string(),
        })
    }

    pub fn get_connection(&self) -> &Connection {
        &self.connection
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub async fn ping(&self) -> Result<bool> {
        debug!("Checking LanceDB connection");

        match self.connection.table_names().execute().await {
            Ok(_) => Ok(true),
            Err(e) => Err(PipelineError::Database(format!(
                "LanceDB connection failed: {}",
                e
            ))),
        }
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|name| name == table_name))
    }

    pub async fn get_table(&self, table_name: &str) -> Result<Table> {
        self.connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to open table {}: {}", table_name, e))
            })
    }

    pub async fn count_rows(&self, filter: Option<String>) -> Result<usize> {
        if !self.table_exists(&self.table_name).await? {
            return Ok(0);
        }

        let table = self.get_table(&self.table_name).await?;
        table
            .count_rows(filter)
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to count rows: {}", e)))
    }

    pub async fn delete_where(&self, predicate: &str) -> Result<()> {
        if !self.table_exists(&self.table_name).await? {
            return Ok(());
        }

        let table = self.get_table(&self.table_name).await?;
        debug!("Deleting rows with predicate: {}", predicate);

        table
            .delete(predicate)
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to delete rows: {}", e)))?;
        Ok(())
    }

    /// Rows matching `filter`, as records.
    pub async fn find(&self, filter: &str, limit: usize) -> Result<Vec<VectorRecord>> {
        if !self.table_exists(&self.table_name).await? {
            return Ok(Vec::new());
        }

        let table = self.get_table(&self.table_name).await?;
        let stream = table
            .query()
            .only_if(filter)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Query failed: {}", e)))?;

        Ok(collect_rows(stream)
            .await?
            .into_iter()
            .map(|(record, _)| record)
            .collect())
    }

    /// Search for records by vector similarity
    ///
    /// # Returns
    /// Vector of SearchResult ordered by similarity (highest first)
    pub async fn vector_search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if !self.table_exists(&self.table_name).await? {
            warn!("Table does not exist, returning empty results");
            return Ok(Vec::new());
        }

        let table = self.get_table(&self.table_name).await?;

        debug!("Performing vector search with limit {}", limit);

        let stream = table
            .vector_search(query_embedding)
            .map_err(|e| PipelineError::Database(format!("Failed to create vector search: {}", e)))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Vector search failed: {}", e)))?;

        let search_results: Vec<SearchResult> = collect_rows(stream)
            .await?
            .iter()
            .map(|(record, distance)| match distance {
                // lower distance = higher similarity
                Some(dist) => SearchResult::from_record(record, 1.0 / (1.0 + dist), Some(*dist)),
                None => SearchResult::from_record(record, 1.0, None),
            })
            .collect();

        debug!("Vector search returned {} results", search_results.len());
        Ok(search_results)
    }
}

async fn collect_rows(
    mut stream: SendableRecordBatchStream,
) -> Result<Vec<(VectorRecord, Option<f32>)>> {
    let mut rows = Vec::new();

    while let Some(batch_result) = stream.next().await {
        let batch = batch_result
            .map_err(|e| PipelineError::Database(format!("Failed to read result batch: {}", e)))?;
        rows.extend(records_from_batch(&batch)?);
    }

    Ok(rows)
}

fn column<'b, T: 'static>(batch: &'b RecordBatch, name: &str) -> Result<&'b T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::Database(format!("Missing '{}' column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| PipelineError::Database(format!("Invalid '{}' column type", name)))
}

/// Converts a result batch back into records, with the `_distance` column
/// when the batch came from a vector search.
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<(VectorRecord, Option<f32>)>> {
    let ids = column::<StringArray>(batch, "id")?;
    let document_ids = column::<StringArray>(batch, "document_id")?;
    let file_names = column::<StringArray>(batch, "file_name")?;
    let kinds = column::<StringArray>(batch, "kind")?;
    let chunk_indexes = column::<UInt32Array>(batch, "chunk_index")?;
    let texts = column::<StringArray>(batch, "text")?;
    let content_hashes = column::<StringArray>(batch, "content_hash")?;
    let created_ats = column::<Int64Array>(batch, "created_at")?;
    let embeddings = column::<FixedSizeListArray>(batch, "embedding")?;

    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let embedding = embeddings.value(i);
        let vector = embedding
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| PipelineError::Database("Invalid embedding values".to_string()))?
            .values()
            .to_vec();

        let kind = FileKind::from_extension(kinds.value(i)).ok_or_else(|| {
            PipelineError::Database(format!("Unknown file kind '{}'", kinds.value(i)))
        })?;

        let record = VectorRecord {
            id: ids.value(i).to_string(),
            document_id: document_ids.value(i).to_string(),
            file_name: file_names.value(i).to_string(),
            kind,
            chunk_index: chunk_indexes.value(i),
            text: texts.value(i).to_string(),
            vector,
            content_hash: content_hashes.value(i).to_string(),
            created_at: created_ats.value(i),
        };

        rows.push((record, distances.map(|d| d.value(i))));
    }

    Ok(rows)
}

/// Quotes a value for use in a LanceDB filter expression.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("it's"), "'it''s'");
    }
}
