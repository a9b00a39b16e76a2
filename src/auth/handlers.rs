use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, TokenPair},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo_types::User,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/user", get(get_user))
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn issue_tokens(state: &AppState, user: &User) -> Result<TokenPair, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access = keys
        .sign_access(user.id)
        .map_err(|e| ApiError::internal("Failed to sign access token", e))?;
    let refresh = keys
        .sign_refresh(user.id)
        .map_err(|e| ApiError::internal("Failed to sign refresh token", e))?;
    Ok(TokenPair { access, refresh })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = required(payload.email.map(|e| e.to_lowercase()));
    let password = payload.password.filter(|p| !p.is_empty());

    let (email, password) = match (email, password) {
        (Some(e), Some(p)) => (e, p),
        _ => {
            return Err(ApiError::validation("Email and password are required"));
        }
    };
    let Some(username) = required(payload.username) else {
        return Err(ApiError::validation("Username is required"));
    };

    match User::find_by_email(&state.db, &email).await {
        Ok(Some(_)) => {
            warn!(email = %email, "email already registered");
            return Err(ApiError::DuplicateEmail);
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "duplicate email check failed");
            return Err(ApiError::internal("Registration failed", e));
        }
    }

    let hash =
        hash_password(&password).map_err(|e| ApiError::internal("Registration failed", e))?;

    let user = match User::create(&state.db, &email, &username, &hash).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(ApiError::internal("Registration failed", e));
        }
    };

    let tokens = issue_tokens(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: PublicUser::from(&user),
            tokens,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = required(payload.email.map(|e| e.to_lowercase()));
    let password = payload.password.filter(|p| !p.is_empty());
    let (email, password) = match (email, password) {
        (Some(e), Some(p)) => (e, p),
        _ => {
            return Err(ApiError::validation("Email and password are required"));
        }
    };

    // Unknown email and wrong password return the same message so responses
    // cannot be used to enumerate accounts.
    let user = match User::find_by_email(&state.db, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid email or password"));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(ApiError::internal("Login failed", e));
        }
    };

    let ok = verify_password(&password, &user.password_hash)
        .map_err(|e| ApiError::internal("Login failed", e))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid email or password"));
    }

    let tokens = issue_tokens(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        user: PublicUser::from(&user),
        tokens,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired refresh token"))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| ApiError::internal("Token refresh failed", e))?
        .ok_or(ApiError::Unauthorized("User not found"))?;

    let tokens = issue_tokens(&state, &user)?;

    Ok(Json(AuthResponse {
        message: "Token refreshed",
        user: PublicUser::from(&user),
        tokens,
    }))
}

/// GET /auth/user — current user identity from the access token.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, ApiError> {
    // This endpoint only ever answers 401 on failure: a token whose user
    // cannot be resolved is treated as unauthenticated.
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "get_user lookup failed");
            ApiError::Unauthorized("Authentication required")
        })?
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn required_rejects_blank_and_missing() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some("   ".into())), None);
        assert_eq!(required(Some(" bob ".into())), Some("bob".to_string()));
    }

    // The fake state's lazy pool has no reachable database, so every repo
    // call errors. That exercises the handlers' database-failure arms.

    #[tokio::test]
    async fn register_surfaces_duplicate_check_failure() {
        let state = AppState::fake();
        let payload = RegisterRequest {
            email: Some("x@x.com".into()),
            password: Some("long-enough".into()),
            username: Some("x".into()),
        };
        let err = register(State(state), Json(payload)).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Internal {
                context: "Registration failed",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn get_user_answers_unauthorized_on_lookup_failure() {
        let state = AppState::fake();
        let err = get_user(State(state), AuthUser(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
