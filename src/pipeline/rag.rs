// file: src/pipeline/rag.rs
// description: chunked indexing, similarity retrieval and grounded answers
// reference: index -> retrieve -> prompt -> generate

use crate::config::Config;
use crate::database::VectorStore;
use crate::embedding::Embedder;
use crate::error::{PipelineError, Result};
use crate::extractor::{self, ExcelLayout, UploadRoute};
use crate::generation::{Generator, PromptTemplate};
use crate::models::{IndexedDocument, RagAnswer, SearchResult, VectorRecord};
use crate::parser::{ChunkSplitter, document_id};
use crate::utils::Validator;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Chunks sent to the embedder per request.
const EMBED_BATCH_SIZE: usize = 64;

pub struct RagPipeline {
    splitter: ChunkSplitter,
    excel_layout: ExcelLayout,
    top_k: usize,
    prompt: PromptTemplate,
    embedder: Arc<dyn Embedder>,
    store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn Generator>>,
}

impl RagPipeline {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        store: Option<Arc<dyn VectorStore>>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Result<Self> {
        Ok(Self {
            splitter: ChunkSplitter::new(config.pipeline.chunk_size, config.pipeline.chunk_overlap)?,
            excel_layout: config.pipeline.excel_layout,
            top_k: config.pipeline.top_k,
            prompt: PromptTemplate::new(),
            embedder,
            store,
            generator,
        })
    }

    pub fn generator_model(&self) -> Option<&str> {
        self.generator.as_ref().map(|g| g.model())
    }

    fn store(&self) -> Result<&Arc<dyn VectorStore>> {
        self.store.as_ref().ok_or_else(|| {
            PipelineError::Unavailable("retrieval needs a configured vector store".to_string())
        })
    }

    fn require_fixed_dimension(&self) -> Result<()> {
        if self.embedder.dimension().is_none() {
            return Err(PipelineError::Unsupported(format!(
                "the {} embedder has no fixed dimension and cannot be used for retrieval",
                self.embedder.name()
            )));
        }
        Ok(())
    }

    /// Splits the file into chunks and stores one record per chunk under
    /// ids `"{document_id}#{n}"`, replacing the chunks of any earlier version.
    pub async fn index_document(&self, file_name: &str, temp_path: &Path) -> Result<IndexedDocument> {
        let store = self.store()?;
        self.require_fixed_dimension()?;

        let file_name = Validator::upload_file_name(file_name)?;
        let kind = UploadRoute::All.resolve(&file_name)?;
        let extracted = extractor::extract_path_as(temp_path, kind, self.excel_layout).await?;

        let chunks = self.splitter.split_segments(&extracted.segments);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyText(file_name));
        }
        debug!("Split {} into {} chunks", file_name, chunks.len());

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            vectors.extend(self.embedder.embed_batch(batch).await?);
        }
        if vectors.len() != chunks.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let doc_id = document_id(UploadRoute::All, &file_name);
        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(n, (text, vector))| {
                VectorRecord::new(
                    format!("{}#{}", doc_id, n),
                    doc_id.clone(),
                    file_name.clone(),
                    kind,
                    text,
                    vector,
                )
                .with_chunk_index(n as u32)
            })
            .collect();

        let stale = store.delete_chunks(&doc_id).await?;
        if stale > 0 {
            debug!("Removed {} chunks of the previous {}", stale, doc_id);
        }
        let written = store.upsert(&records).await?;
        info!("Indexed {} as {} chunks", doc_id, written);

        Ok(IndexedDocument {
            document_id: doc_id,
            chunks: records.len(),
        })
    }

    /// Stored chunks most similar to `query`, best first.
    pub async fn retrieve(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(PipelineError::Validation("query must not be empty".to_string()));
        }
        let store = self.store()?;
        self.require_fixed_dimension()?;

        let limit = top_k.unwrap_or(self.top_k).max(1);
        let query_vector = self.embedder.embed(query).await?;
        let results = store.search(&query_vector, limit).await?;
        debug!("Retrieved {} chunks for query", results.len());
        Ok(results)
    }

    pub async fn answer(&self, query: &str, top_k: Option<usize>) -> Result<RagAnswer> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            PipelineError::Unavailable("no generation model is configured".to_string())
        })?;

        let sources = self.retrieve(query, top_k).await?;
        let context = sources
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = self.prompt.render(&context, query);
        let answer = generator.generate(&prompt).await?;

        Ok(RagAnswer { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::embedding::{HashingEmbedder, TfidfVectorizer};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    fn pipeline(
        embedder: Arc<dyn Embedder>,
        store: Option<Arc<dyn VectorStore>>,
        generator: Option<Arc<dyn Generator>>,
    ) -> RagPipeline {
        let mut config = Config::default_config();
        config.pipeline.chunk_size = 80;
        config.pipeline.chunk_overlap = 0;
        config.pipeline.top_k = 2;
        RagPipeline::new(&config, embedder, store, generator).unwrap()
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const FACTS: &str = "Rust guarantees memory safety without a garbage collector.\n\n\
        Bananas are rich in potassium and grow in tropical climates.\n\n\
        The borrow checker enforces ownership rules at compile time.";

    #[tokio::test]
    async fn test_index_and_retrieve() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "facts.txt", FACTS);
        let store = Arc::new(MemoryStore::new());
        let rag = pipeline(Arc::new(HashingEmbedder::new(256)), Some(store.clone()), None);

        let indexed = rag.index_document("facts.txt", &path).await.unwrap();
        assert_eq!(indexed.document_id, "all_facts_txt");
        assert!(indexed.chunks >= 3);
        assert_eq!(store.count().await.unwrap(), indexed.chunks);
        assert!(store.get("all_facts_txt#0").await.unwrap().is_some());

        let results = rag
            .retrieve("bananas potassium tropical", Some(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("Bananas"));
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_chunks() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let rag = pipeline(Arc::new(HashingEmbedder::new(64)), Some(store.clone()), None);

        let path = write_file(&temp, "facts.txt", FACTS);
        let first = rag.index_document("facts.txt", &path).await.unwrap();
        assert!(first.chunks >= 3);

        let path = write_file(&temp, "facts.txt", "Only one short line remains.");
        let second = rag.index_document("facts.txt", &path).await.unwrap();
        assert_eq!(second.chunks, 1);
        assert_eq!(store.count().await.unwrap(), second.chunks);
        assert!(store.get("all_facts_txt#1").await.unwrap().is_none());

        let results = rag.retrieve("bananas potassium", Some(5)).await.unwrap();
        assert!(results.iter().all(|r| !r.text.contains("Bananas")));
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "facts.txt", FACTS);
        let rag = pipeline(
            Arc::new(HashingEmbedder::new(256)),
            Some(Arc::new(MemoryStore::new())),
            Some(Arc::new(EchoGenerator)),
        );
        rag.index_document("facts.txt", &path).await.unwrap();

        let answer = rag.answer("What does the borrow checker do?", None).await.unwrap();
        assert_eq!(answer.sources.len(), 2);
        assert!(answer.answer.contains("[What does the borrow checker do?]"));
        assert!(answer.answer.contains(&answer.sources[0].text));
    }

    #[tokio::test]
    async fn test_answer_without_generator_is_unavailable() {
        let rag = pipeline(
            Arc::new(HashingEmbedder::new(16)),
            Some(Arc::new(MemoryStore::new())),
            None,
        );
        let err = rag.answer("anything", None).await;
        assert!(matches!(err, Err(PipelineError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_retrieve_requirements() {
        let rag = pipeline(Arc::new(HashingEmbedder::new(16)), None, None);
        assert!(matches!(
            rag.retrieve("query", None).await,
            Err(PipelineError::Unavailable(_))
        ));

        let rag = pipeline(
            Arc::new(TfidfVectorizer::new()),
            Some(Arc::new(MemoryStore::new())),
            None,
        );
        assert!(matches!(
            rag.retrieve("query", None).await,
            Err(PipelineError::Unsupported(_))
        ));

        let rag = pipeline(
            Arc::new(HashingEmbedder::new(16)),
            Some(Arc::new(MemoryStore::new())),
            None,
        );
        assert!(matches!(
            rag.retrieve("   ", None).await,
            Err(PipelineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_index_empty_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "empty.txt", "   ");
        let rag = pipeline(
            Arc::new(HashingEmbedder::new(16)),
            Some(Arc::new(MemoryStore::new())),
            None,
        );
        assert!(matches!(
            rag.index_document("empty.txt", &path).await,
            Err(PipelineError::EmptyText(_))
        ));
    }
}
