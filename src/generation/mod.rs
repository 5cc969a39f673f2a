// file: src/generation/mod.rs
// description: answer generation trait and provider selection
// reference: internal module structure

pub mod groq;
pub mod prompt;

use crate::config::GenerationConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub use groq::GroqChatClient;
pub use prompt::{PromptTemplate, RAG_TEMPLATE};

#[async_trait]
pub trait Generator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Returns `None` when no API key is configured.
pub fn build_generator(config: &GenerationConfig) -> Option<Arc<dyn Generator>> {
    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(api_key) => {
            info!("Using generation model: {}", config.model);
            Some(Arc::new(GroqChatClient::new(api_key.to_string(), config)))
        }
        None => {
            warn!("No generation API key configured, answers are disabled");
            None
        }
    }
}
