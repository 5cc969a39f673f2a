// file: src/database/json_store.rs
// description: one JSON file per vector record in a local folder
// reference: Production-grade metadata persistence

use super::{VectorStore, rank};
use crate::config::StorageBackend;
use crate::error::{PipelineError, Result};
use crate::models::{SearchResult, VectorRecord};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

pub struct JsonFileStore {
    vector_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(vector_dir: PathBuf) -> Self {
        Self { vector_dir }
    }

    pub fn vector_dir(&self) -> &Path {
        &self.vector_dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(PipelineError::Validation(format!("Invalid record id: {:?}", id)));
        }
        Ok(self.vector_dir.join(format!("{}.json", id)))
    }

    async fn record_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(&self.vector_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PipelineError::FileOperation {
                    path: self.vector_dir.clone(),
                    source,
                });
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_record(path: &Path) -> Result<VectorRecord> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|source| PipelineError::FileOperation {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn load_all(&self) -> Result<Vec<VectorRecord>> {
        let mut records = Vec::new();
        for path in self.record_files().await? {
            match Self::read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable vector file {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl VectorStore for JsonFileStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Json
    }

    async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.vector_dir)
            .await
            .map_err(|source| PipelineError::FileOperation {
                path: self.vector_dir.clone(),
                source,
            })?;
        info!("Storing vectors under {}", self.vector_dir.display());
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        self.init().await?;

        for record in records {
            let path = self.path_for(&record.id)?;
            let contents = serde_json::to_string_pretty(record)?;
            fs::write(&path, contents)
                .await
                .map_err(|source| PipelineError::FileOperation {
                    path: path.clone(),
                    source,
                })?;
            debug!("Saved vector to {}", path.display());
        }

        Ok(records.len())
    }

    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let records = self.load_all().await?;
        Ok(rank(&records, query, limit))
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let path = self.path_for(id)?;
        match Self::read_record(&path).await {
            Ok(record) => Ok(Some(record)),
            Err(PipelineError::FileOperation { source, .. })
                if source.kind() == ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(PipelineError::FileOperation { path, source }),
        }
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<usize> {
        let mut removed = 0;
        for path in self.record_files().await? {
            let record = match Self::read_record(&path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable vector file {}: {}", path.display(), e);
                    continue;
                }
            };
            if !record.is_chunk_of(document_id) {
                continue;
            }
            fs::remove_file(&path)
                .await
                .map_err(|source| PipelineError::FileOperation {
                    path: path.clone(),
                    source,
                })?;
            removed += 1;
        }
        debug!("Removed {} chunks of {}", removed, document_id);
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.record_files().await?.len())
    }

    async fn clear(&self) -> Result<()> {
        for path in self.record_files().await? {
            fs::remove_file(&path)
                .await
                .map_err(|source| PipelineError::FileOperation {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
