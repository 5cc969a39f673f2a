// file: src/pipeline/orchestrator.rs
// description: batch ingestion of local files through the document processor
// reference: orchestrates asynchronous ingestion workflow

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::processor::DocumentProcessor;
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::pipeline::scanner::{FileScanner, ScannedFile};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct PipelineOrchestrator {
    processor: Arc<DocumentProcessor>,
    scanner: FileScanner,
    max_concurrent_tasks: usize,
    /// `None` hides the progress bars; `Some(colored)` draws them on stderr.
    progress: Option<bool>,
}

impl PipelineOrchestrator {
    pub fn new(config: &Config, processor: Arc<DocumentProcessor>) -> Self {
        Self {
            processor,
            scanner: FileScanner::new(&config.pipeline),
            max_concurrent_tasks: config.pipeline.parallel_workers.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, colored: bool) -> Self {
        self.progress = Some(colored);
        self
    }

    /// Vectorizes every supported file under `paths`. Per-file failures are
    /// counted and logged; only scanning errors abort the run.
    pub async fn run(&self, paths: &[PathBuf]) -> Result<PipelineStats> {
        info!("Starting batch ingestion");

        let files = self.scanner.scan_paths(paths)?;
        if files.is_empty() {
            warn!("No files found to process");
            return Ok(PipelineStats::new());
        }

        info!(
            "Processing {} files with {} concurrent tasks...",
            files.len(),
            self.max_concurrent_tasks
        );

        let tracker = Arc::new(match self.progress {
            Some(colored) => ProgressTracker::new(files.len(), colored),
            None => ProgressTracker::hidden(files.len()),
        });
        self.process_files(files, tracker.clone()).await;

        let stats = tracker.get_stats();
        tracker.finish();
        log_final_stats(&stats);

        Ok(stats)
    }

    async fn process_files(&self, files: Vec<ScannedFile>, progress: Arc<ProgressTracker>) {
        let tasks = files.into_iter().map(|file| {
            let processor = self.processor.clone();
            let progress = progress.clone();

            async move {
                progress.set_message(file.relative_path.clone());
                match processor.process_file(&file.path).await {
                    Ok(processed) => {
                        progress.inc_files_processed(file.size, processed.stored);
                    }
                    Err(e) => {
                        progress.inc_files_failed();
                        warn!("Failed to process file {}: {}", file.relative_path, e);
                    }
                }
            }
        });

        stream::iter(tasks)
            .buffer_unordered(self.max_concurrent_tasks)
            .collect::<Vec<()>>()
            .await;
    }
}

fn log_final_stats(stats: &PipelineStats) {
    info!("=== Ingestion Summary ===");
    info!("Duration: {} seconds", stats.duration_secs);
    info!("Files processed: {}", stats.files_processed);
    info!("Files failed: {}", stats.files_failed);
    info!("Success rate: {:.2}%", stats.success_rate());
    info!("Records stored: {}", stats.records_stored);
    info!(
        "Processing speed: {:.2} files/sec",
        stats.files_per_second()
    );
    info!(
        "Bytes read: {:.2} MB",
        stats.total_bytes_processed as f64 / 1_048_576.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, VectorStore};
    use crate::embedding::HashingEmbedder;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_counts_successes_and_failures() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("a.txt"), "alpha document").unwrap();
        fs::write(docs.join("b.txt"), "beta document").unwrap();
        fs::write(docs.join("empty.txt"), "").unwrap();
        fs::write(docs.join("ignored.md"), "# not supported").unwrap();

        let mut config = Config::default_config();
        config.server.upload_dir = temp.path().join("uploads");
        config.pipeline.parallel_workers = 2;

        let store = Arc::new(MemoryStore::new());
        let processor = Arc::new(DocumentProcessor::new(
            &config,
            Arc::new(HashingEmbedder::new(16)),
            Some(store.clone()),
        ));
        let orchestrator = PipelineOrchestrator::new(&config, processor);

        let stats = orchestrator
            .run(&[docs])
            .await
            .unwrap();

        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.records_stored, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get("all_a_txt").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_with_nothing_to_do() {
        let temp = TempDir::new().unwrap();
        let config = Config::default_config();
        let processor = Arc::new(DocumentProcessor::new(
            &config,
            Arc::new(HashingEmbedder::new(16)),
            None,
        ));

        let stats = PipelineOrchestrator::new(&config, processor)
            .run(&[temp.path().to_path_buf()])
            .await
            .unwrap();
        assert_eq!(stats.files_processed, 0);
    }
}
