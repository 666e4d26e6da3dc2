use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value as JsonValue };

/// A single raw conversation turn, normally shaped `"Speaker: text"`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub message: String,
}

impl ConversationTurn {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Speaker label: everything before the first `:`, trimmed.
    /// Turns without a colon are attributed to "Unknown".
    pub fn speaker(&self) -> &str {
        match self.message.split_once(':') {
            Some((speaker, _)) => speaker.trim(),
            None => "Unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Calculated,
}

/// Per-turn analysis entry returned by `/analyze_conversation`.
///
/// `metrics` and `llm_per_turn_suggestion` are always empty here; the
/// frontend fills them in with its own simulation layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnAnalysisResult {
    pub turn: usize,
    pub speaker: String,
    pub message: String,
    pub probability: f64,
    pub status: TurnStatus,
    pub metrics: Map<String, JsonValue>,
    pub llm_per_turn_suggestion: String,
}

impl TurnAnalysisResult {
    pub fn calculated(turn: usize, raw_message: &str, probability: f64) -> Self {
        let conversation_turn = ConversationTurn::new(raw_message);
        Self {
            turn,
            speaker: conversation_turn.speaker().to_string(),
            message: raw_message.to_string(),
            probability,
            status: TurnStatus::Calculated,
            metrics: Map::new(),
            llm_per_turn_suggestion: String::new(),
        }
    }
}

/// Coaching bullet points returned by `/get_llm_advice`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdviceResult {
    pub points: Vec<String>,
}

impl AdviceResult {
    pub fn single(point: impl Into<String>) -> Self {
        Self { points: vec![point.into()] }
    }
}

/// Full payload returned by `/chat_llm`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResult {
    pub user_message: String,
    pub raw_chat_response: String,
    pub raw_json_prompt_response: String,
    pub parsed_json_metrics: Option<JsonValue>,
    pub status: String,
}
