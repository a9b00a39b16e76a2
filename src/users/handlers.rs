use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, repo_types::User},
    error::ApiError,
    history::QueryHistory,
    state::AppState,
    users::dto::{HistoryEntry, Profile, ProfilePatch},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/queries", get(list_queries))
        .route(
            "/users/profile",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
}

/// Resolve the token's user row. A valid token whose user has been deleted
/// is treated as unauthenticated.
async fn require_user(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to load user", e))?
        .ok_or(ApiError::Unauthorized("Authentication required"))
}

/// GET /users/queries — the caller's last queries, newest first.
#[instrument(skip(state))]
pub async fn list_queries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, user_id).await?;

    let history = QueryHistory::list_recent(&state.db, user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to get history", e))?
        .into_iter()
        .map(HistoryEntry::from)
        .collect::<Vec<_>>();

    Ok(Json(json!({ "history": history })))
}

/// GET /users/profile
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, user_id).await?;
    Ok(Json(json!({ "profile": Profile::from(&user) })))
}

/// PUT /users/profile — partial patch; absent keys leave stored values alone.
#[instrument(skip(state, patch))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Value>, ApiError> {
    require_user(&state, user_id).await?;

    let user = User::update_profile(&state.db, user_id, &patch)
        .await
        .map_err(|e| ApiError::internal("Failed to update profile", e))?
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "profile": Profile::from(&user),
    })))
}

/// DELETE /users/profile — irreversible; history rows cascade.
#[instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, user_id).await?;

    let deleted = User::delete(&state.db, user.id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete profile", e))?;
    if !deleted {
        return Err(ApiError::Unauthorized("Authentication required"));
    }

    info!(user_id = %user.id, email = %user.email, "account deleted");
    Ok(Json(json!({
        "message": "Account deleted successfully",
        "email": user.email,
    })))
}
