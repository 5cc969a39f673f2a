// file: src/models/search_result.rs
// description: Search result model with similarity scores
// reference: Used for vector similarity search results

use super::VectorRecord;
use crate::utils::Validator;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Record ID (`{document_id}#{n}` for chunks)
    pub id: String,

    pub document_id: String,

    pub file_name: String,

    pub chunk_index: u32,

    /// Stored text of the record
    pub text: String,

    /// Similarity score (higher is more similar)
    pub score: f32,

    /// Optional: Distance metric (lower is more similar)
    pub distance: Option<f32>,
}

impl SearchResult {
    pub fn from_record(record: &VectorRecord, score: f32, distance: Option<f32>) -> Self {
        Self {
            id: record.id.clone(),
            document_id: record.document_id.clone(),
            file_name: record.file_name.clone(),
            chunk_index: record.chunk_index,
            text: record.text.clone(),
            score,
            distance,
        }
    }

    /// Format as a summary string for display
    pub fn format_summary(&self, max_content_len: usize) -> String {
        let content_preview = Validator::truncate_text(&self.text, max_content_len);

        format!(
            "Score: {:.4} | {} ({} #{})\n{}\n",
            self.score, self.id, self.file_name, self.chunk_index, content_preview
        )
    }
}
