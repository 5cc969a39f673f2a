// file: src/pipeline/processor.rs
// description: turns an uploaded file into a stored text + vector record
// reference: extracts, normalizes, embeds and persists one document

use crate::config::{Config, PipelineConfig};
use crate::database::VectorStore;
use crate::embedding::Embedder;
use crate::error::{PipelineError, Result};
use crate::extractor::{self, UploadRoute};
use crate::models::{ProcessedDocument, VectorRecord};
use crate::parser::{TextNormalizer, document_id};
use crate::utils::Validator;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct DocumentProcessor {
    pipeline: PipelineConfig,
    upload_dir: PathBuf,
    normalizer: Option<TextNormalizer>,
    embedder: Arc<dyn Embedder>,
    store: Option<Arc<dyn VectorStore>>,
}

impl DocumentProcessor {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        store: Option<Arc<dyn VectorStore>>,
    ) -> Self {
        let normalizer = if config.pipeline.preprocess {
            Some(TextNormalizer::new())
        } else {
            None
        };

        Self {
            pipeline: config.pipeline.clone(),
            upload_dir: config.server.upload_dir.clone(),
            normalizer,
            embedder,
            store,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn store(&self) -> Option<&Arc<dyn VectorStore>> {
        self.store.as_ref()
    }

    /// Processes a file already spooled to `temp_path`. `file_name` is the
    /// client-supplied name; it decides the format and the document id.
    /// The caller owns `temp_path` and removes it.
    pub async fn process_upload(
        &self,
        route: UploadRoute,
        file_name: &str,
        temp_path: &Path,
    ) -> Result<ProcessedDocument> {
        let file_name = Validator::upload_file_name(file_name)?;
        let kind = route.resolve(&file_name)?;
        info!("Processing {} upload: {}", route.label(), file_name);

        let extracted =
            extractor::extract_path_as(temp_path, kind, self.pipeline.excel_layout).await?;
        if extracted.is_empty() {
            return Err(PipelineError::EmptyText(file_name));
        }

        let embed_input = match &self.normalizer {
            Some(normalizer) => normalizer.preprocess(&extracted.text),
            None => extracted.text.clone(),
        };
        if embed_input.trim().is_empty() {
            return Err(PipelineError::EmptyText(file_name));
        }

        let vector = self.embedder.embed(&embed_input).await?;
        let dimension = vector.len();
        debug!(
            "Embedded {} with {} ({} dimensions)",
            file_name,
            self.embedder.name(),
            dimension
        );

        let id = document_id(route, &file_name);
        let stored = match &self.store {
            Some(store) => {
                let record = VectorRecord::new(
                    id.clone(),
                    id.clone(),
                    file_name.clone(),
                    kind,
                    extracted.text.clone(),
                    vector.clone(),
                );
                store.upsert(std::slice::from_ref(&record)).await?;
                info!("Stored {} in {} store", id, store.backend().as_str());
                true
            }
            None => false,
        };

        Ok(ProcessedDocument {
            document_id: id,
            file_name,
            kind,
            text: extracted.text,
            vector,
            dimension,
            stored,
        })
    }

    /// Spools `bytes` into a temp file under the upload directory and
    /// processes it. The temp file is gone when this returns.
    pub async fn process_bytes(
        &self,
        route: UploadRoute,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ProcessedDocument> {
        let spooled = self.spool(bytes).await?;
        let result = self.process_upload(route, file_name, spooled.path()).await;
        close_temp(spooled);
        result
    }

    /// Processes a file on disk as an upload on the catch-all route.
    pub async fn process_file(&self, path: &Path) -> Result<ProcessedDocument> {
        Validator::validate_file_path(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::Validation(format!("Invalid path: {}", path.display())))?;

        self.process_upload(UploadRoute::All, file_name, path).await
    }

    async fn spool(&self, bytes: &[u8]) -> Result<tempfile::NamedTempFile> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|source| PipelineError::FileOperation {
                path: self.upload_dir.clone(),
                source,
            })?;

        let upload_dir = self.upload_dir.clone();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || -> Result<tempfile::NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix("upload-")
                .tempfile_in(&upload_dir)?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| PipelineError::Validation(format!("Spooling task failed: {}", e)))?
    }
}

/// Deletes a spooled upload, logging instead of failing when removal does.
pub(crate) fn close_temp(file: tempfile::NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        tracing::warn!("Failed to remove temp file {}: {}", path.display(), e);
    }
}
