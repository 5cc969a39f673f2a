// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod document;
pub mod response;
pub mod search_result;

pub use document::VectorRecord;
pub use response::{IndexedDocument, ProcessedDocument, RagAnswer};
pub use search_result::SearchResult;
