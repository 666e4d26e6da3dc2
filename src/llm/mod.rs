pub mod chat;
pub mod normalize;

use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorType {
    Gemini,
    OpenAI,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseGeneratorTypeError {
    message: String,
}

impl fmt::Display for ParseGeneratorTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseGeneratorTypeError {}

impl FromStr for GeneratorType {
    type Err = ParseGeneratorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(GeneratorType::Gemini),
            "openai" => Ok(GeneratorType::OpenAI),
            _ =>
                Err(ParseGeneratorTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub generator_type: GeneratorType,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            generator_type: GeneratorType::Gemini,
            api_key: None,
            model: None,
            base_url: None,
        }
    }
}
