use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::instrument;

use crate::{
    ai::{
        dto::{CompareResponse, PromptRequest, RubricCompareResponse},
        evaluator,
        providers::{self, Provider, ProviderResult},
    },
    auth::jwt::MaybeUser,
    error::ApiError,
    history::{self, QueryMode},
    state::AppState,
};

pub fn ai_routes() -> Router<AppState> {
    Router::new()
        .route("/ai/groq", post(groq))
        .route("/ai/gemini", post(gemini))
        .route("/ai/compare", post(compare))
        .route("/ai/compare-with-rubric", post(compare_with_rubric))
}

/// Single-provider endpoints surface upstream failures inside the result
/// body; the status code alone flips to 500.
fn single_provider_response(result: ProviderResult) -> Response {
    let status = if result.is_err() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(result)).into_response()
}

async fn single_provider(
    state: &AppState,
    user_id: Option<uuid::Uuid>,
    provider: &dyn Provider,
    payload: PromptRequest,
    mode: QueryMode,
) -> Result<Response, ApiError> {
    let prompt = payload.into_prompt()?;
    let result = providers::run(provider, &prompt).await;

    if !result.is_err() {
        let (groq, gemini) = match mode {
            QueryMode::Groq => (result.response.as_deref(), None),
            _ => (None, result.response.as_deref()),
        };
        history::record(state, user_id, &prompt, groq, gemini, mode).await;
    }

    Ok(single_provider_response(result))
}

#[instrument(skip(state, payload))]
pub async fn groq(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
    Json(payload): Json<PromptRequest>,
) -> Result<Response, ApiError> {
    single_provider(&state, user_id, &state.ai.groq, payload, QueryMode::Groq).await
}

#[instrument(skip(state, payload))]
pub async fn gemini(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
    Json(payload): Json<PromptRequest>,
) -> Result<Response, ApiError> {
    single_provider(&state, user_id, &state.ai.gemini, payload, QueryMode::Gemini).await
}

/// POST /ai/compare — both providers, issued concurrently. A failure on one
/// side still renders the other; history is written only when both succeeded.
#[instrument(skip(state, payload))]
pub async fn compare(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
    Json(payload): Json<PromptRequest>,
) -> Result<Json<CompareResponse>, ApiError> {
    let prompt = payload.into_prompt()?;

    let (groq, gemini) = tokio::join!(
        providers::run(&state.ai.groq, &prompt),
        providers::run(&state.ai.gemini, &prompt),
    );

    if !groq.is_err() && !gemini.is_err() {
        history::record(
            &state,
            user_id,
            &prompt,
            groq.response.as_deref(),
            gemini.response.as_deref(),
            QueryMode::Both,
        )
        .await;
    }

    Ok(Json(CompareResponse { groq, gemini }))
}

/// POST /ai/compare-with-rubric — both providers plus a judged comparison.
/// This endpoint requires both providers to succeed before judging.
#[instrument(skip(state, payload))]
pub async fn compare_with_rubric(
    State(state): State<AppState>,
    MaybeUser(user_id): MaybeUser,
    Json(payload): Json<PromptRequest>,
) -> Result<Response, ApiError> {
    let prompt = payload.into_prompt()?;

    let (groq, gemini) = tokio::join!(
        providers::run(&state.ai.groq, &prompt),
        providers::run(&state.ai.gemini, &prompt),
    );

    if groq.is_err() || gemini.is_err() {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to get responses from one or both AI models",
                "groq": groq,
                "gemini": gemini,
            })),
        )
            .into_response());
    }

    let response_a = groq.response.clone().unwrap_or_default();
    let response_b = gemini.response.clone().unwrap_or_default();

    // Gemini judges first; Groq is the one-shot fallback.
    let evaluation = evaluator::evaluate(
        &state.ai.gemini,
        &state.ai.groq,
        &prompt,
        &response_a,
        &response_b,
    )
    .await;

    if evaluation.success {
        history::record(
            &state,
            user_id,
            &prompt,
            Some(&response_a),
            Some(&response_b),
            QueryMode::CompareWithRubric,
        )
        .await;
    }

    Ok(Json(RubricCompareResponse {
        prompt,
        responses: CompareResponse { groq, gemini },
        evaluation,
    })
    .into_response())
}
