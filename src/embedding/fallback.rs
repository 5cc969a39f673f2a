// file: src/embedding/fallback.rs
// description: primary embedder with hashing fallback on failure
// reference: internal resilience pattern

use super::{Embedder, HashingEmbedder};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct FallbackEmbedder {
    primary: Arc<dyn Embedder>,
    fallback: HashingEmbedder,
}

impl FallbackEmbedder {
    pub fn new(primary: Arc<dyn Embedder>, fallback: HashingEmbedder) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Embedder for FallbackEmbedder {
    fn name(&self) -> &str {
        self.primary.name()
    }

    fn dimension(&self) -> Option<usize> {
        self.fallback.dimension()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let expected = self.fallback.dimension();

        match self.primary.embed_batch(texts).await {
            Ok(vectors) if vectors.iter().all(|v| Some(v.len()) == expected) => Ok(vectors),
            Ok(vectors) => {
                warn!(
                    "{} returned vectors of dimension {:?}, expected {:?}; using fallback embeddings",
                    self.primary.name(),
                    vectors.first().map(Vec::len),
                    expected
                );
                self.fallback.embed_batch(texts).await
            }
            Err(e) => {
                warn!(
                    "{} failed ({}); using fallback embeddings",
                    self.primary.name(),
                    e
                );
                self.fallback.embed_batch(texts).await
            }
        }
    }
}
