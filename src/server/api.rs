use crate::agent::{ SalesAgent, SCORER_UNAVAILABLE_MSG };
use crate::error::ApiError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use log::error;
use serde_json::{ json, Value as JsonValue };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<SalesAgent>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/analyze_conversation", post(analyze_conversation))
        .route("/get_llm_advice", post(get_llm_advice))
        .route("/chat_llm", post(chat_llm))
        .layer(cors)
        .with_state(state)
}

/// Pull `conversation` out of the body as a list of strings; anything
/// else is a client error.
fn parse_conversation(body: &JsonValue) -> Result<Vec<String>, ApiError> {
    let field = body
        .get("conversation")
        .ok_or_else(|| {
            ApiError::InvalidRequest("Invalid request. 'conversation' field is required.".into())
        })?;
    let items = field
        .as_array()
        .ok_or_else(|| {
            ApiError::InvalidRequest("'conversation' must be a list of strings.".into())
        })?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    ApiError::InvalidRequest("'conversation' must be a list of strings.".into())
                })
        })
        .collect()
}

pub async fn analyze_conversation(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>
) -> Response {
    // Availability is checked before validation; an uninitialized scoring
    // backend fails every request the same way.
    if !state.agent.scorer_ready() {
        error!("API call received but the scoring backend is not initialized.");
        return ApiError::ServiceUnavailable(SCORER_UNAVAILABLE_MSG.to_string()).into_response();
    }

    let conversation = match parse_conversation(&body) {
        Ok(conversation) => conversation,
        Err(e) => {
            return e.into_response();
        }
    };

    match state.agent.analyze_conversation(&conversation).await {
        Ok(results) =>
            (
                StatusCode::OK,
                Json(json!({ "results": results, "llm_advice_pending": true })),
            ).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_llm_advice(
    State(state): State<AppState>,
    Json(body): Json<JsonValue>
) -> Response {
    // Lenient extraction: a missing or ill-typed field degrades to an
    // empty conversation and takes the 400 path below.
    let conversation: Vec<String> = body
        .get("conversation")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    match state.agent.conversation_advice(&conversation).await {
        Ok(advice) => (StatusCode::OK, Json(advice)).into_response(),
        // Both error paths keep the `points` body shape so the frontend
        // can always render something.
        Err(e @ ApiError::ServiceUnavailable(_)) => {
            error!("LLM advice requested but the chat model is not initialized.");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "points": [e.to_string()] })),
            ).into_response()
        }
        Err(e @ ApiError::InvalidRequest(_)) =>
            (StatusCode::BAD_REQUEST, Json(json!({ "points": [e.to_string()] }))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn chat_llm(State(state): State<AppState>, Json(body): Json<JsonValue>) -> Response {
    let message = body
        .get("message")
        .and_then(JsonValue::as_str)
        .unwrap_or("")
        .to_string();

    match state.agent.chat(&message).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Status page: reports whether each backend handle initialized.
pub async fn index(State(state): State<AppState>) -> Json<JsonValue> {
    let scorer_ready = state.agent.scorer_ready();
    let generator_ready = state.agent.generator_ready();

    let mut status_message = if scorer_ready {
        "Sales analysis backend is running and the scoring model initialized successfully."
            .to_string()
    } else {
        "Sales analysis backend is running but the scoring model failed to load.".to_string()
    };
    if generator_ready {
        status_message.push_str(
            " Chat LLM is also initialized and available for chat and conversation advice."
        );
    } else {
        status_message.push_str(
            " Chat LLM failed to load. LLM chat and conversation advice will be unavailable."
        );
    }

    Json(
        json!({
        "status_message": status_message,
        "scoring_model_initialized": scorer_ready,
        "chat_llm_initialized": generator_ready,
    })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use crate::llm::chat::{ CompletionResponse, GenerateError, GenerateOptions, Generator };
    use crate::scoring::{ ScoreError, Scorer, TurnScore };

    struct FixedScorer;

    #[async_trait]
    impl Scorer for FixedScorer {
        async fn score_progression(&self, turns: &[String]) -> Result<Vec<TurnScore>, ScoreError> {
            Ok(
                (1..=turns.len())
                    .map(|n| TurnScore { probability: (n as f64) / 10.0 })
                    .collect()
            )
        }
    }

    struct FixedGenerator {
        plain: &'static str,
        json: &'static str,
    }

    #[async_trait]
    impl Generator for FixedGenerator {
        async fn complete(
            &self,
            _prompt: &str,
            _opts: &GenerateOptions
        ) -> Result<CompletionResponse, GenerateError> {
            Ok(CompletionResponse { response: self.plain.to_string() })
        }

        async fn complete_json(
            &self,
            _prompt: &str,
            _opts: &GenerateOptions
        ) -> Result<CompletionResponse, GenerateError> {
            Ok(CompletionResponse { response: self.json.to_string() })
        }

        fn get_model(&self) -> String {
            "fixed".to_string()
        }
    }

    fn state_with(
        scorer: Option<Arc<dyn Scorer>>,
        generator: Option<Arc<dyn Generator>>
    ) -> AppState {
        AppState { agent: Arc::new(SalesAgent::with_backends(scorer, generator)) }
    }

    async fn body_json(response: Response) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_results_in_input_order() {
        let state = state_with(Some(Arc::new(FixedScorer)), None);
        let body = json!({ "conversation": ["Alice: Hi there", "Bob: Hello"] });

        let response = analyze_conversation(State(state), Json(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["llm_advice_pending"], true);
        let results = payload["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["turn"], 1);
        assert_eq!(results[0]["speaker"], "Alice");
        assert_eq!(results[1]["turn"], 2);
        assert_eq!(results[1]["speaker"], "Bob");
        assert_eq!(results[0]["status"], "calculated");
    }

    #[tokio::test]
    async fn analyze_rejects_missing_conversation_field() {
        let state = state_with(Some(Arc::new(FixedScorer)), None);

        let response = analyze_conversation(State(state), Json(json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let payload = body_json(response).await;
        assert!(payload["error"].as_str().unwrap().contains("'conversation' field is required"));
    }

    #[tokio::test]
    async fn analyze_rejects_non_string_turns() {
        let state = state_with(Some(Arc::new(FixedScorer)), None);
        let body = json!({ "conversation": ["Alice: Hi", 42] });

        let response = analyze_conversation(State(state), Json(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let payload = body_json(response).await;
        assert!(payload["error"].as_str().unwrap().contains("list of strings"));
    }

    #[tokio::test]
    async fn analyze_without_scorer_is_500_regardless_of_input() {
        let state = state_with(None, None);

        let response = analyze_conversation(State(state.clone()), Json(json!({}))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload = body_json(response).await;
        assert!(payload["error"].as_str().unwrap().contains("not initialized"));

        let response = analyze_conversation(
            State(state),
            Json(json!({ "conversation": ["Alice: Hi"] }))
        ).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn advice_returns_points_payload() {
        let generator = FixedGenerator {
            plain: "ok",
            json: r#"{"points": ["Follow up tomorrow"]}"#,
        };
        let state = state_with(None, Some(Arc::new(generator)));
        let body = json!({ "conversation": ["Alice: Hi"] });

        let response = get_llm_advice(State(state), Json(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["points"][0], "Follow up tomorrow");
    }

    #[tokio::test]
    async fn advice_with_unparsable_output_is_still_200() {
        let generator = FixedGenerator { plain: "ok", json: "definitely not json" };
        let state = state_with(None, Some(Arc::new(generator)));
        let body = json!({ "conversation": ["Alice: Hi"] });

        let response = get_llm_advice(State(state), Json(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        let points = payload["points"].as_array().unwrap();
        assert!(!points.is_empty());
        assert!(points[0].as_str().unwrap().contains("Error parsing LLM JSON advice"));
    }

    #[tokio::test]
    async fn advice_without_generator_keeps_points_shape() {
        let state = state_with(None, None);
        let body = json!({ "conversation": ["Alice: Hi"] });

        let response = get_llm_advice(State(state), Json(body)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let payload = body_json(response).await;
        assert!(payload["points"][0].as_str().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn advice_with_empty_conversation_is_400_with_points() {
        let generator = FixedGenerator { plain: "ok", json: "{}" };
        let state = state_with(None, Some(Arc::new(generator)));

        let response = get_llm_advice(State(state), Json(json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let payload = body_json(response).await;
        assert!(payload["points"][0].as_str().unwrap().contains("No conversation provided"));
    }

    #[tokio::test]
    async fn chat_round_trips_message_and_metrics() {
        let generator = FixedGenerator {
            plain: "Hello back!",
            json: r#"{"summary": "greeting", "sentiment": "neutral", "keywords": []}"#,
        };
        let state = state_with(None, Some(Arc::new(generator)));
        let body = json!({ "message": "Hello" });

        let response = chat_llm(State(state), Json(body)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["user_message"], "Hello");
        assert_eq!(payload["raw_chat_response"], "Hello back!");
        assert_eq!(payload["parsed_json_metrics"]["sentiment"], "neutral");
        assert_eq!(payload["status"], "success");
    }

    #[tokio::test]
    async fn chat_with_unparsable_metrics_returns_null() {
        let generator = FixedGenerator { plain: "Hello back!", json: "oops" };
        let state = state_with(None, Some(Arc::new(generator)));

        let response = chat_llm(State(state), Json(json!({ "message": "Hello" }))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["raw_json_prompt_response"], "oops");
        assert!(payload["parsed_json_metrics"].is_null());
    }

    #[tokio::test]
    async fn chat_rejects_empty_message() {
        let generator = FixedGenerator { plain: "ok", json: "{}" };
        let state = state_with(None, Some(Arc::new(generator)));

        let response = chat_llm(State(state), Json(json!({ "message": "" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let payload = body_json(response).await;
        assert!(payload["error"].as_str().unwrap().contains("No message provided"));
    }

    #[tokio::test]
    async fn index_reports_handle_states() {
        let state = state_with(Some(Arc::new(FixedScorer)), None);

        let Json(payload) = index(State(state)).await;
        assert_eq!(payload["scoring_model_initialized"], true);
        assert_eq!(payload["chat_llm_initialized"], false);
        assert!(payload["status_message"].as_str().unwrap().contains("failed to load"));
    }
}
