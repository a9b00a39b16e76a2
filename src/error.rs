use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error type. Every variant renders as a JSON body so no
/// internal fault ever reaches the client as a non-JSON response.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("{context}: {details}")]
    Internal {
        context: &'static str,
        details: String,
    },
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn internal(context: &'static str, err: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            context,
            details: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Email already exists" })),
            )
                .into_response(),
            ApiError::Internal { context, details } => {
                tracing::error!(error = %details, "{context}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": context, "details": details })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let res = ApiError::validation("Prompt is required").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let res = ApiError::Unauthorized("Authentication required").into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn duplicate_email_maps_to_400() {
        let res = ApiError::DuplicateEmail.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_maps_to_500() {
        let res = ApiError::internal("Login failed", "boom").into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
