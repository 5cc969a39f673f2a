// file: src/models/document.rs
// description: stored vector record with source text and metadata
// reference: internal data structures

use crate::extractor::FileKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One stored vector: a whole document or one chunk of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub document_id: String,
    pub file_name: String,
    pub kind: FileKind,
    pub chunk_index: u32,
    pub text: String,
    pub vector: Vec<f32>,
    pub content_hash: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl VectorRecord {
    pub fn new(
        id: String,
        document_id: String,
        file_name: String,
        kind: FileKind,
        text: String,
        vector: Vec<f32>,
    ) -> Self {
        let content_hash = Self::compute_hash(&text);

        Self {
            id,
            document_id,
            file_name,
            kind,
            chunk_index: 0,
            text,
            vector,
            content_hash,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_chunk_index(mut self, chunk_index: u32) -> Self {
        self.chunk_index = chunk_index;
        self
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// True for a retrieval chunk of `document_id`. The whole-document record
    /// an upload stores under the document id itself is not a chunk.
    pub fn is_chunk_of(&self, document_id: &str) -> bool {
        self.document_id == document_id && self.id != document_id
    }

    pub fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
