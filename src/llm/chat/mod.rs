pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;

use self::gemini::GeminiGenerator;
use self::openai::OpenAIGenerator;
use super::{ GeneratorConfig, GeneratorType };

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// Per-call generation knobs. `response_schema` is only honored by
/// `complete_json` on backends with native schema enforcement.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub response_schema: Option<JsonValue>,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    /// Upstream rate/quota limit; callers degrade instead of failing hard.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("llm backend error: {0}")]
    Backend(String),

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// A text-generation backend in two modes: plain completion and
/// JSON-constrained completion.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        opts: &GenerateOptions
    ) -> Result<CompletionResponse, GenerateError>;

    async fn complete_json(
        &self,
        prompt: &str,
        opts: &GenerateOptions
    ) -> Result<CompletionResponse, GenerateError>;

    fn get_model(&self) -> String;
}

pub fn new_generator(
    config: &GeneratorConfig
) -> Result<Arc<dyn Generator>, GenerateError> {
    let generator: Arc<dyn Generator> = match config.generator_type {
        GeneratorType::Gemini => Arc::new(GeminiGenerator::from_config(config)?),
        GeneratorType::OpenAI => Arc::new(OpenAIGenerator::from_config(config)?),
    };
    Ok(generator)
}

/// Provider SDK errors arrive as strings; pick the quota/rate-limit ones
/// out so callers can degrade with a distinct message.
pub(crate) fn classify_backend_error(message: String) -> GenerateError {
    let lowered = message.to_lowercase();
    if lowered.contains("429")
        || lowered.contains("resource_exhausted")
        || lowered.contains("rate limit")
        || lowered.contains("quota")
    {
        GenerateError::QuotaExceeded(message)
    } else {
        GenerateError::Backend(message)
    }
}
