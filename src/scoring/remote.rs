use async_trait::async_trait;
use log::info;
use serde::{ Deserialize, Serialize };

use super::{ ScoreError, Scorer, TurnScore };

#[derive(Serialize)]
struct ScoreRequest<'a> {
    conversation: &'a [String],
}

#[derive(Deserialize)]
struct ScoreResponse {
    results: Vec<TurnScore>,
}

/// HTTP client for the hosted sales-conversion scoring model.
pub struct RemoteScoringClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteScoringClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One-shot startup probe. A failure here leaves the scoring handle
    /// unset for the rest of the process lifetime.
    pub async fn probe(&self) -> Result<(), ScoreError> {
        let url = format!("{}/health", self.base_url);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(ScoreError::Status(resp.status()));
        }
        info!("Scoring service reachable at {}", self.base_url);
        Ok(())
    }
}

#[async_trait]
impl Scorer for RemoteScoringClient {
    async fn score_progression(&self, turns: &[String]) -> Result<Vec<TurnScore>, ScoreError> {
        let url = format!("{}/analyze", self.base_url);
        let resp = self.http
            .post(&url)
            .json(&ScoreRequest { conversation: turns })
            .send().await?;

        if !resp.status().is_success() {
            return Err(ScoreError::Status(resp.status()));
        }

        let body: ScoreResponse = resp
            .json().await
            .map_err(|e| ScoreError::BadResponse(e.to_string()))?;

        Ok(body.results)
    }
}
