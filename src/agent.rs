use log::{ error, info, warn };
use serde_json::{ json, Value as JsonValue };
use std::sync::Arc;

use crate::cli::Args;
use crate::error::ApiError;
use crate::llm::chat::{
    new_generator,
    GenerateError,
    GenerateOptions,
    Generator,
};
use crate::llm::normalize::{ normalize, preview, NormalizedJson };
use crate::llm::{ GeneratorConfig, GeneratorType };
use crate::models::{ AdviceResult, ChatResult, TurnAnalysisResult };
use crate::scoring::remote::RemoteScoringClient;
use crate::scoring::Scorer;

pub const SCORER_UNAVAILABLE_MSG: &str =
    "Scoring model not initialized on backend. Check server logs.";
pub const ADVICE_UNAVAILABLE_MSG: &str =
    "LLM advice unavailable. Chat model failed to load on backend.";
pub const CHAT_UNAVAILABLE_MSG: &str =
    "LLM chat functionality unavailable. Chat model failed to load.";
const ADVICE_QUOTA_MSG: &str =
    "Quota Exceeded: Cannot generate overall LLM advice due to API rate limits. \
     Please try again in a minute or two.";

fn advice_prompt(full_convo_text: &str) -> String {
    format!(
        "Analyze the entire following sales conversation:\n\n\
         {}\n\n\
         As a concise sales coach, provide actionable advice to the salesperson on how to best \
         progress this sales call towards a successful outcome. \
         Provide this advice as a JSON object with a single key 'points' which is an array of \
         strings, where each string is a distinct, actionable bullet point. \
         Do NOT include any other text outside the JSON object. Ensure the JSON is well-formed \
         and complete.",
        full_convo_text
    )
}

fn advice_response_schema() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "points": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["points"]
    })
}

fn chat_prompt(user_message: &str) -> String {
    format!("Respond to the following message concisely: '{}'", user_message)
}

fn chat_analysis_prompt(user_message: &str) -> String {
    format!(
        "Analyze the following message: '{}'. \
         Provide a JSON object with 'summary', 'sentiment' (positive/neutral/negative), \
         and 'keywords' (array of strings). Do not include any other text outside the JSON block.",
        user_message
    )
}

/// Application context. Both backend handles are initialized exactly once
/// at startup; a failed initialization stays `None` for the process
/// lifetime and every dependent request fails fast.
pub struct SalesAgent {
    scorer: Option<Arc<dyn Scorer>>,
    generator: Option<Arc<dyn Generator>>,
}

impl SalesAgent {
    pub async fn initialize(args: &Args) -> Self {
        info!("--- Starting scoring model initialization ---");
        let scorer = match Self::initialize_scorer(args).await {
            Ok(scorer) => {
                info!("Scoring model backend initialized successfully.");
                Some(scorer)
            }
            Err(e) => {
                error!("CRITICAL: scoring model initialization failed: {}", e);
                None
            }
        };

        info!("--- Starting chat LLM initialization ---");
        let generator = match Self::initialize_generator(args).await {
            Ok(generator) => {
                info!("Chat LLM ({}) initialized successfully.", generator.get_model());
                Some(generator)
            }
            Err(e) => {
                error!("CRITICAL: chat LLM initialization failed: {}", e);
                error!("LLM chat and conversation advice will be unavailable.");
                None
            }
        };
        info!("--- Finished model initialization ---");

        Self { scorer, generator }
    }

    /// Dependency-injection constructor; also the seam the tests use to
    /// swap in deterministic backends.
    pub fn with_backends(
        scorer: Option<Arc<dyn Scorer>>,
        generator: Option<Arc<dyn Generator>>
    ) -> Self {
        Self { scorer, generator }
    }

    async fn initialize_scorer(args: &Args) -> Result<Arc<dyn Scorer>, crate::scoring::ScoreError> {
        let client = RemoteScoringClient::new(&args.scoring_base_url);
        client.probe().await?;
        Ok(Arc::new(client))
    }

    async fn initialize_generator(args: &Args) -> Result<Arc<dyn Generator>, GenerateError> {
        let generator_type: GeneratorType = args.chat_llm_type
            .parse()
            .map_err(|e: crate::llm::ParseGeneratorTypeError| GenerateError::Backend(e.to_string()))?;
        let api_key = if !args.chat_api_key.is_empty() {
            Some(args.chat_api_key.clone())
        } else {
            None
        };
        let config = GeneratorConfig {
            generator_type,
            api_key,
            model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
        };
        let generator = new_generator(&config)?;
        info!(
            "Chat client configured: Type={}, Model={}",
            args.chat_llm_type,
            generator.get_model()
        );

        // Tiny completion to verify the key and model actually work.
        let probe_opts = GenerateOptions { max_tokens: Some(10), ..Default::default() };
        let probe = generator.complete("Hello.", &probe_opts).await?;
        info!("Chat LLM probe response: {}", preview(&probe.response));

        Ok(generator)
    }

    pub fn scorer_ready(&self) -> bool {
        self.scorer.is_some()
    }

    pub fn generator_ready(&self) -> bool {
        self.generator.is_some()
    }

    /// Progressive conversation analysis: score each prefix of the
    /// conversation and keep the probability of the prefix's last turn.
    /// Any scoring failure aborts the whole request; no partial results.
    pub async fn analyze_conversation(
        &self,
        conversation: &[String]
    ) -> Result<Vec<TurnAnalysisResult>, ApiError> {
        let scorer = self.scorer
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable(SCORER_UNAVAILABLE_MSG.to_string()))?;

        if conversation.is_empty() {
            return Err(
                ApiError::InvalidRequest(
                    "'conversation' must be a non-empty list of strings.".to_string()
                )
            );
        }

        info!("Received conversation for analysis: {:?}", conversation);

        let mut results = Vec::with_capacity(conversation.len());
        for (i, raw_message) in conversation.iter().enumerate() {
            let prefix = &conversation[..=i];
            let scores = scorer
                .score_progression(prefix).await
                .map_err(|e| {
                    ApiError::Internal(format!("An error occurred during analysis: {}", e))
                })?;
            let probability = scores.last().map(|s| s.probability).unwrap_or(0.0);
            results.push(TurnAnalysisResult::calculated(i + 1, raw_message, probability));
        }

        Ok(results)
    }

    /// Whole-conversation coaching advice. Upstream failures past the
    /// availability/validation checks degrade into a `points` payload
    /// rather than an error.
    pub async fn conversation_advice(
        &self,
        conversation: &[String]
    ) -> Result<AdviceResult, ApiError> {
        let generator = self.generator
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable(ADVICE_UNAVAILABLE_MSG.to_string()))?;

        if conversation.is_empty() {
            return Err(
                ApiError::InvalidRequest("No conversation provided for LLM advice.".to_string())
            );
        }

        let full_convo_text = conversation.join("\n");
        let prompt = advice_prompt(&full_convo_text);
        info!("Prompting for structured full conversation advice: {}", preview(&prompt));

        let opts = GenerateOptions {
            max_tokens: Some(300),
            temperature: Some(0.6),
            response_schema: Some(advice_response_schema()),
        };

        let raw = match generator.complete_json(&prompt, &opts).await {
            Ok(resp) => resp.response,
            Err(GenerateError::QuotaExceeded(detail)) => {
                warn!("Quota exceeded for LLM advice: {}", detail);
                return Ok(AdviceResult::single(ADVICE_QUOTA_MSG));
            }
            Err(GenerateError::EmptyResponse) => {
                warn!("Empty or malformed LLM response for overall advice.");
                return Ok(AdviceResult::single("LLM returned an empty or malformed response."));
            }
            Err(e) => {
                error!("Error generating structured advice for full conversation: {}", e);
                return Ok(AdviceResult::single(format!("Error generating LLM advice: {}", e)));
            }
        };

        info!("Raw LLM advice response: {}", raw);

        let points = match
            normalize(&raw, |v| v.get("points").map(|p| p.is_array()).unwrap_or(false))
        {
            NormalizedJson::Parsed(value) => {
                value["points"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .map(|p| {
                                p.as_str()
                                    .map(str::to_string)
                                    .unwrap_or_else(|| p.to_string())
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            }
            NormalizedJson::WrongShape { preview } => {
                warn!("LLM did not return a 'points' array in structured advice: {}", preview);
                vec![
                    format!(
                        "LLM response was not structured as expected (missing 'points' array). Raw: {}...",
                        preview
                    )
                ]
            }
            NormalizedJson::Unparsable { preview } => {
                warn!("JSON parsing error for overall advice. Raw: {}", preview);
                vec![
                    format!(
                        "Error parsing LLM JSON advice. This happens with incomplete LLM responses \
                         (e.g., due to API rate limits or max tokens). Please try a shorter \
                         conversation or wait a moment. Raw response starts with: {}...",
                        preview
                    )
                ]
            }
        };

        Ok(AdviceResult { points })
    }

    /// Single-message chat: one free-text reply plus one structured
    /// sentiment/keyword analysis. A JSON analysis that fails to parse is
    /// logged and returned as `parsed_json_metrics: null`, never an error.
    pub async fn chat(&self, user_message: &str) -> Result<ChatResult, ApiError> {
        let generator = self.generator
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable(CHAT_UNAVAILABLE_MSG.to_string()))?;

        if user_message.trim().is_empty() {
            return Err(ApiError::InvalidRequest("No message provided.".to_string()));
        }

        info!("Received message for LLM chat: {}", user_message);

        let chat_opts = GenerateOptions {
            max_tokens: Some(150),
            temperature: Some(0.7),
            response_schema: None,
        };
        let chat_resp = generator
            .complete(&chat_prompt(user_message), &chat_opts).await
            .map_err(|e| ApiError::Internal(format!("An error occurred during LLM chat: {}", e)))?;
        let raw_chat_response = chat_resp.response.trim().to_string();
        info!("Raw chat response: {}", raw_chat_response);

        let analysis_opts = GenerateOptions {
            max_tokens: Some(200),
            temperature: Some(0.1),
            response_schema: None,
        };
        let json_resp = generator
            .complete_json(&chat_analysis_prompt(user_message), &analysis_opts).await
            .map_err(|e| ApiError::Internal(format!("An error occurred during LLM chat: {}", e)))?;
        let raw_json_prompt_response = json_resp.response.trim().to_string();
        info!("Raw JSON prompt response: {}", raw_json_prompt_response);

        // Any successful parse counts; only unparsable text nulls the field.
        let parsed_json_metrics = match normalize(&raw_json_prompt_response, |_| true) {
            NormalizedJson::Parsed(value) => Some(value),
            NormalizedJson::WrongShape { preview } | NormalizedJson::Unparsable { preview } => {
                warn!("JSON parsing failed for chat analysis. Raw: {}", preview);
                None
            }
        };

        Ok(ChatResult {
            user_message: user_message.to_string(),
            raw_chat_response,
            raw_json_prompt_response,
            parsed_json_metrics,
            status: "success".to_string(),
        })
    }
}
