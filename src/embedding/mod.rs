// file: src/embedding/mod.rs
// description: embedder trait, shared tokenization and provider selection
// reference: internal module structure

pub mod fallback;
pub mod groq;
pub mod hashing;
#[cfg(feature = "local-embeddings")]
pub mod local;
pub mod tfidf;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

pub use fallback::FallbackEmbedder;
pub use groq::GroqEmbeddingClient;
pub use hashing::HashingEmbedder;
#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;
pub use tfidf::TfidfVectorizer;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\b\w\w+\b").expect("TOKEN regex is valid");
}

/// Lowercased runs of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    /// Fixed output width, or `None` when it depends on the input.
    fn dimension(&self) -> Option<usize>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| PipelineError::Embedding(format!("{} returned no vector", self.name())))
    }
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProvider::Groq => match config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(api_key) => {
                let client = GroqEmbeddingClient::new(
                    api_key.to_string(),
                    config.base_url.clone(),
                    config.model.clone(),
                    config.dimension,
                );
                if config.fallback_on_error {
                    Arc::new(FallbackEmbedder::new(
                        Arc::new(client),
                        HashingEmbedder::new(config.dimension),
                    ))
                } else {
                    Arc::new(client)
                }
            }
            None => {
                warn!("No embedding API key configured, using hashing embeddings");
                Arc::new(HashingEmbedder::new(config.dimension))
            }
        },
        EmbeddingProvider::Tfidf => Arc::new(TfidfVectorizer::new()),
        EmbeddingProvider::Hash => Arc::new(HashingEmbedder::new(config.dimension)),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Arc::new(LocalEmbedder::new()?),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => {
            return Err(PipelineError::Config(
                "the local embedding provider requires the local-embeddings feature".to_string(),
            ));
        }
    };

    info!("Using embedder: {}", embedder.name());
    Ok(embedder)
}
