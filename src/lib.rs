// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns

//! Upload PDF, DOCX, XLSX and TXT files, extract their text, turn it into
//! vectors and answer questions over the stored chunks.

pub mod config;
pub mod database;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod server;
pub mod utils;

pub use config::{
    Config, EmbeddingConfig, EmbeddingProvider, GenerationConfig, PipelineConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
pub use database::{VectorStore, build_store};
pub use embedding::{Embedder, build_embedder};
pub use error::{PipelineError, Result};
pub use extractor::{ExcelLayout, ExtractedText, FileKind, UploadRoute};
pub use generation::{Generator, build_generator};
pub use models::{IndexedDocument, ProcessedDocument, RagAnswer, SearchResult, VectorRecord};
pub use pipeline::{
    DocumentProcessor, FileScanner, PipelineOrchestrator, PipelineStats, ProgressTracker,
    RagPipeline,
};
pub use server::AppState;
pub use utils::{HealthReport, HealthStatus, OperationTimer, PerformanceMetrics, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        assert!(build_embedder(&config.embedding).is_ok());
        assert!(UploadRoute::All.accepts(FileKind::Xlsx));
    }
}
