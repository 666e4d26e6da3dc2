use async_trait::async_trait;
use log::info;
use reqwest::{
    header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE },
    Client as HttpClient,
    StatusCode,
};
use serde::{ Deserialize, Serialize };

use super::{ CompletionResponse, GenerateError, GenerateOptions, Generator };
use crate::llm::GeneratorConfig;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

pub struct OpenAIGenerator {
    http: HttpClient,
    model: String,
    base_url: String,
}

impl OpenAIGenerator {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, GenerateError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                GenerateError::Backend(format!("Invalid API key format: {}", e))
            })?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerateError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| GenerateError::Backend("OpenAI API key is required".to_string()))?;
        Self::new(api_key, config.model.clone(), config.base_url.clone())
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn chat_completion(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
        response_format: Option<ResponseFormat>
    ) -> Result<CompletionResponse, GenerateError> {
        let req = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
            response_format,
        };

        let resp = self.http.post(self.completions_url()).json(&req).send().await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            let detail = resp.text().await.unwrap_or_default();
            return Err(GenerateError::QuotaExceeded(detail));
        }
        let body: OpenAIResponse = resp.error_for_status()?.json().await?;

        let content = body.choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(GenerateError::EmptyResponse)?;

        Ok(CompletionResponse { response: content })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn complete(
        &self,
        prompt: &str,
        opts: &GenerateOptions
    ) -> Result<CompletionResponse, GenerateError> {
        info!("OpenAIGenerator::complete() → model={}", self.model);
        self.chat_completion(prompt, opts, None).await
    }

    async fn complete_json(
        &self,
        prompt: &str,
        opts: &GenerateOptions
    ) -> Result<CompletionResponse, GenerateError> {
        // json_object mode; the finer-grained schema in `opts` is already
        // spelled out in the prompt for this backend.
        info!("OpenAIGenerator::complete_json() → model={}", self.model);
        let format = ResponseFormat { format_type: "json_object".to_string() };
        self.chat_completion(prompt, opts, Some(format)).await
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
