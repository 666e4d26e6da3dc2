pub mod remote;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// One entry of the progressive scoring sequence.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TurnScore {
    pub probability: f64,
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scoring service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected scoring response: {0}")]
    BadResponse(String),
}

/// The conversion-scoring black box: an ordered conversation in, one
/// probability per turn out.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score_progression(&self, turns: &[String]) -> Result<Vec<TurnScore>, ScoreError>;
}
