// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use crate::extractor::ExcelLayout;
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "DOCVEC";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    None,
    Memory,
    LanceDb,
    Json,
    Firestore,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::None => "none",
            StorageBackend::Memory => "memory",
            StorageBackend::LanceDb => "lancedb",
            StorageBackend::Json => "json",
            StorageBackend::Firestore => "firestore",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub uri: String,
    pub table_name: String,
    pub vector_dir: PathBuf,
    pub batch_size: usize,
    #[serde(default)]
    pub firestore: FirestoreConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FirestoreConfig {
    pub base_url: Option<String>,
    pub project_id: Option<String>,
    pub collection: Option<String>,
    pub access_token: Option<String>,
}

impl FirestoreConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or("https://firestore.googleapis.com/v1")
    }

    pub fn collection(&self) -> &str {
        self.collection.as_deref().unwrap_or("documents")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Groq,
    Tfidf,
    Hash,
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub fallback_on_error: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub preprocess: bool,
    pub excel_layout: ExcelLayout,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub parallel_workers: usize,
    pub skip_patterns: Vec<String>,
    pub max_file_size_mb: usize,
}

impl Config {
    /// Builds the configuration from built-in defaults, an optional TOML file
    /// and `DOCVEC__SECTION__KEY` environment overrides, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.apply_well_known_env();
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                upload_dir: PathBuf::from("data/uploads"),
                max_upload_mb: 16,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                uri: "data/lancedb".to_string(),
                table_name: "documents".to_string(),
                vector_dir: PathBuf::from("data/vectors"),
                batch_size: 100,
                firestore: FirestoreConfig::default(),
            },
            embedding: EmbeddingConfig {
                provider: EmbeddingProvider::Groq,
                api_key: None,
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "nomic-embed-text-v1_5".to_string(),
                dimension: 768,
                fallback_on_error: true,
            },
            generation: GenerationConfig {
                api_key: None,
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                temperature: 0.2,
                max_tokens: 1024,
            },
            pipeline: PipelineConfig {
                preprocess: true,
                excel_layout: ExcelLayout::Table,
                chunk_size: 1000,
                chunk_overlap: 200,
                top_k: 4,
                parallel_workers: 4,
                skip_patterns: vec![".git/".to_string(), "~$".to_string()],
                max_file_size_mb: 16,
            },
        }
    }

    /// `GROQ_API_KEY` is honoured for both clients when no key was configured.
    fn apply_well_known_env(&mut self) {
        if let Ok(key) = std::env::var("GROQ_API_KEY")
            && !key.trim().is_empty()
        {
            if self.embedding.api_key.is_none() {
                self.embedding.api_key = Some(key.clone());
            }
            if self.generation.api_key.is_none() {
                self.generation.api_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.parallel_workers == 0 {
            return Err(PipelineError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        Validator::validate_batch_size(self.storage.batch_size)?;
        Validator::validate_url(&self.embedding.base_url)?;
        Validator::validate_url(&self.generation.base_url)?;
        if let Some(base_url) = &self.storage.firestore.base_url {
            Validator::validate_url(base_url)?;
        }

        if self.pipeline.chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.chunk_overlap >= self.pipeline.chunk_size {
            return Err(PipelineError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.pipeline.chunk_overlap, self.pipeline.chunk_size
            )));
        }

        if self.pipeline.top_k == 0 {
            return Err(PipelineError::Config(
                "top_k must be greater than 0".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(PipelineError::Config(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        if self.server.max_upload_mb == 0 {
            return Err(PipelineError::Config(
                "max_upload_mb must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Firestore
            && self.storage.firestore.project_id.is_none()
        {
            return Err(PipelineError::Config(
                "storage.firestore.project_id is required for the firestore backend".to_string(),
            ));
        }

        Ok(())
    }

    pub fn max_upload_bytes(&self) -> u64 {
        (self.server.max_upload_mb as u64) * 1_048_576
    }
}
