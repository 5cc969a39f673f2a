// file: src/parser/mod.rs
// description: text normalization and chunking module exports
// reference: internal module structure

pub mod normalizer;
pub mod splitter;

pub use normalizer::{TextNormalizer, document_id, preprocess_text, sanitize_id};
pub use splitter::ChunkSplitter;
