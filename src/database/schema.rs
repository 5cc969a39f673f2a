// file: src/database/schema.rs
// description: LanceDB schema management for vector storage
// reference: https://docs.rs/lancedb

use crate::database::client::LanceDbClient;
use crate::error::{PipelineError, Result};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;
use tracing::{info, warn};

pub const EMBEDDING_COLUMN: &str = "embedding";

pub struct SchemaManager<'a> {
    client: &'a LanceDbClient,
}

impl<'a> SchemaManager<'a> {
    pub fn new(client: &'a LanceDbClient) -> Self {
        Self { client }
    }

    /// Returns the embedding width of the existing table, if there is one.
    pub async fn initialize(&self) -> Result<Option<usize>> {
        info!("Initializing LanceDB schema");

        if !self.client.table_exists(self.client.table_name()).await? {
            info!("Table will be created on first insert");
            return Ok(None);
        }

        let table = self.client.get_table(self.client.table_name()).await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to read table schema: {}", e)))?;

        let dimension = Self::embedding_dimension(&schema);
        match dimension {
            Some(dim) => info!("Documents table exists with embedding dimension {}", dim),
            None => warn!("Documents table has no '{}' column", EMBEDDING_COLUMN),
        }
        Ok(dimension)
    }

    /// Returns the Arrow schema for the documents table with vector embeddings
    pub fn get_documents_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("file_name", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("content_hash", DataType::Utf8, false),
            Field::new("created_at", DataType::Int64, false),
            Field::new(
                EMBEDDING_COLUMN,
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
        ]))
    }

    pub fn embedding_dimension(schema: &Schema) -> Option<usize> {
        match schema.field_with_name(EMBEDDING_COLUMN).ok()?.data_type() {
            DataType::FixedSizeList(_, size) => Some(*size as usize),
            _ => None,
        }
    }

    pub async fn drop_all_tables(&self) -> Result<()> {
        warn!("Dropping all tables in LanceDB");

        let table_name = self.client.table_name();

        if self.client.table_exists(table_name).await? {
            self.client
                .get_connection()
                .drop_table(table_name)
                .await
                .map_err(|e| {
                    PipelineError::Database(format!("Failed to drop table {}: {}", table_name, e))
                })?;
            info!("Dropped table: {}", table_name);
        }

        Ok(())
    }
}
