// file: src/embedding/tfidf.rs
// description: single-document tf-idf vectorization
// reference: https://scikit-learn.org/stable/modules/feature_extraction.html#tfidf-term-weighting

use super::{Embedder, l2_normalize, tokenize};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Fits a vocabulary on each text on its own and returns its weights.
///
/// With a single document every idf term is 1, so the weights are raw term
/// counts over the sorted vocabulary, L2-normalized. The output length is
/// the vocabulary size of the text, which is why [`Embedder::dimension`]
/// reports `None`.
#[derive(Debug, Default)]
pub struct TfidfVectorizer;

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self
    }

    /// Returns the sorted vocabulary together with the weights.
    pub fn fit_transform(&self, text: &str) -> Result<(Vec<String>, Vec<f32>)> {
        let mut counts: BTreeMap<String, f32> = BTreeMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0.0) += 1.0;
        }

        if counts.is_empty() {
            return Err(PipelineError::Embedding(
                "empty vocabulary; the text contains no terms".to_string(),
            ));
        }

        let (vocabulary, mut weights): (Vec<String>, Vec<f32>) = counts.into_iter().unzip();
        l2_normalize(&mut weights);
        Ok((vocabulary, weights))
    }
}

#[async_trait]
impl Embedder for TfidfVectorizer {
    fn name(&self) -> &str {
        "tfidf"
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| self.fit_transform(text).map(|(_, weights)| weights))
            .collect()
    }
}
