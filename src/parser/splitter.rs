// file: src/parser/splitter.rs
// description: character-based chunking at semantic boundaries
// reference: https://docs.rs/text-splitter

use crate::error::{PipelineError, Result};
use text_splitter::{Characters, ChunkConfig, TextSplitter};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splits text into chunks of at most `chunk_size` characters, with
/// `chunk_overlap` characters shared between neighbours.
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    splitter: TextSplitter<Characters>,
}

impl ChunkSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| PipelineError::Config(format!("Invalid chunk settings: {}", e)))?
            .with_trim(true);

        Ok(Self {
            chunk_size,
            chunk_overlap,
            splitter: TextSplitter::new(config),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        self.splitter
            .chunks(text)
            .map(str::to_string)
            .collect()
    }

    /// Splits every segment and concatenates the chunks in order.
    pub fn split_segments(&self, segments: &[String]) -> Vec<String> {
        segments.iter().flat_map(|s| self.split(s)).collect()
    }
}
