use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::services::ranker::ScoringWeights;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    pub max_chunks: usize,
    #[serde(default)]
    pub weights: ScoringWeights,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    /// Name of the environment variable holding the provider API key.
    pub api_key_env: String,
    pub system_prompt: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    pub flashcard_count: usize,
    pub quiz_questions: usize,
    pub flashcard_context_chars: usize,
    pub quiz_context_chars: usize,
    pub summary_context_chars: usize,
    pub explain_context_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    pub extraction_timeout_secs: u64,
    pub max_file_size_mb: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let config: AppConfig = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size <= self.chunking.overlap {
            return Err(ConfigError::Message(format!(
                "chunking.chunk_size ({}) must be greater than chunking.overlap ({})",
                self.chunking.chunk_size, self.chunking.overlap
            )));
        }
        if self.retrieval.max_chunks == 0 {
            return Err(ConfigError::Message(
                "retrieval.max_chunks must be at least 1".to_string(),
            ));
        }
        if self.generation.flashcard_count == 0 || self.generation.quiz_questions == 0 {
            return Err(ConfigError::Message(
                "generation counts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
