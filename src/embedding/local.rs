// file: src/embedding/local.rs
// description: on-device embeddings with all-MiniLM-L6-v2
// reference: https://docs.rs/fastembed

use super::Embedder;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tracing::info;

const MINILM_DIMENSION: usize = 384;

pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl LocalEmbedder {
    /// Loads the model, downloading it into the fastembed cache on first use.
    pub fn new() -> Result<Self> {
        info!("Loading local embedding model all-MiniLM-L6-v2");
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| PipelineError::Embedding(format!("Failed to load local model: {}", e)))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn dimension(&self) -> Option<usize> {
        Some(MINILM_DIMENSION)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| PipelineError::Embedding("local model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| PipelineError::Embedding(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| PipelineError::Embedding(format!("Embedding task failed: {}", e)))?
    }
}
