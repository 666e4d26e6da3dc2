use async_trait::async_trait;
use log::info;
use reqwest::StatusCode;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

use super::{ classify_backend_error, CompletionResponse, GenerateError, GenerateOptions, Generator };
use crate::llm::GeneratorConfig;
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::LLMProvider;

const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: GoogleContent,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: String,
}

pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| {
                GenerateError::Backend("Google API key is required for GeminiGenerator".to_string())
            })?;
        Ok(Self::new(api_key, config.model.clone(), config.base_url.clone()))
    }

    fn build_provider(
        &self,
        opts: &GenerateOptions
    ) -> Result<Box<dyn LLMProvider>, GenerateError> {
        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(self.api_key.clone())
            .model(&self.model)
            .stream(false);

        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        if let Some(tokens) = opts.max_tokens {
            builder = builder.max_tokens(tokens);
        }
        if let Some(temp) = opts.temperature {
            builder = builder.temperature(temp);
        }

        builder.build().map_err(|e| GenerateError::Backend(e.to_string()))
    }

    fn generate_content_url(&self) -> String {
        let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            base.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn complete(
        &self,
        prompt: &str,
        opts: &GenerateOptions
    ) -> Result<CompletionResponse, GenerateError> {
        let provider = self.build_provider(opts)?;
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: prompt.to_string(),
            message_type: MessageType::Text,
        }];
        info!(
            "GeminiGenerator::complete() → model={} base_url={:?}",
            self.model,
            self.base_url
        );
        let resp = provider
            .chat(&messages).await
            .map_err(|e| classify_backend_error(e.to_string()))?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .unwrap_or_else(|| resp.to_string());
        Ok(CompletionResponse { response: text })
    }

    async fn complete_json(
        &self,
        prompt: &str,
        opts: &GenerateOptions
    ) -> Result<CompletionResponse, GenerateError> {
        let payload = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: opts.response_schema.clone(),
                max_output_tokens: opts.max_tokens,
                temperature: opts.temperature,
            },
        };

        let url = self.generate_content_url();
        info!("GeminiGenerator::complete_json() → model={}", self.model);

        let resp = self.http.post(&url).json(&payload).send().await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            let detail = resp.text().await.unwrap_or_default();
            return Err(GenerateError::QuotaExceeded(detail));
        }
        let resp = resp.error_for_status()?;
        let body: GenerateContentResponse = resp.json().await?;

        let text = body.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(GenerateError::EmptyResponse)?;

        Ok(CompletionResponse { response: text })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
