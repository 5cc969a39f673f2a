// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
mod processor;
mod progress;
mod rag;
mod scanner;

pub use orchestrator::PipelineOrchestrator;
pub use processor::DocumentProcessor;
pub(crate) use processor::close_temp;
pub use progress::{PipelineStats, ProgressTracker};
pub use rag::RagPipeline;
pub use scanner::{FileScanner, ScannedFile};
