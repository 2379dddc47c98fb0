use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::AppState;
use super::error::ApiError;
use super::relay::{BufferedRelay, CompletionRelay, ResponseMode, StreamingRelay};
use crate::llm::provider::{AssistantInput, LlmProvider};
use crate::matcher::best_match;
use crate::neighborhood::load_neighborhoods;
use crate::prompt::compose_system_prompt;
use crate::protocol::ChatRequest;

pub fn app_router<P: LlmProvider>(state: AppState<P>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::<P>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /api/chat
///
/// Validates the body, matches the message against the neighborhood dataset,
/// composes the system prompt and hands the completion to the configured relay.
async fn chat<P: LlmProvider>(
    State(state): State<AppState<P>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Any content type is accepted.
    let request = serde_json::from_slice::<ChatRequest>(&body).map_err(|err| {
        debug!(reason = %err, "unparsable chat request");
        ApiError::InvalidBody
    })?;
    if request.message.trim().is_empty() {
        return Err(ApiError::MissingMessage);
    }

    let Some(provider) = state.llm.as_deref() else {
        return Err(ApiError::MissingApiKey);
    };

    let records = load_neighborhoods(&state.dataset_path).map_err(ApiError::Dataset)?;
    let matched = best_match(&request.message, &records);
    let neighborhood = matched.confident();
    info!(
        session_id = %request.session_id,
        history = request.history.len(),
        neighborhood = neighborhood.map(|r| r.name.as_str()).unwrap_or("-"),
        score = matched.score,
        "chat request"
    );

    let input = AssistantInput {
        system_instruction: Some(compose_system_prompt(state.profile, neighborhood)),
        user_message: request.message,
    };
    let location = matched.location();

    match state.mode {
        ResponseMode::Streaming => StreamingRelay.relay(provider, input, location).await,
        ResponseMode::Buffered => BufferedRelay.relay(provider, input, location).await,
    }
}
