// file: src/models/response.rs
// description: results returned by the upload, index and answer flows
// reference: internal data structures

use super::SearchResult;
use crate::extractor::FileKind;
use serde::{Deserialize, Serialize};

/// Outcome of vectorizing one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub document_id: String,
    pub file_name: String,
    pub kind: FileKind,
    /// Extracted text before preprocessing.
    pub text: String,
    pub vector: Vec<f32>,
    pub dimension: usize,
    /// Whether the record was written to a store.
    pub stored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document_id: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SearchResult>,
}
