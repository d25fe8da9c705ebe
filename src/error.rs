use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::store::StoreError;

/// Request-level failures surfaced to the HTTP caller.
///
/// AI-provider failures on the chat path are deliberately absent here: they
/// degrade to a conversational reply string and never become an HTTP error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Auth server error: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    Store(String),

    #[error("{0} not found or unauthorized")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(&'static str),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::Unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("Note").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Store("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn detail_text() {
        assert_eq!(
            ApiError::NotFound("Note").to_string(),
            "Note not found or unauthorized"
        );
        assert_eq!(
            ApiError::Store("connection reset".into()).to_string(),
            "Database error: connection reset"
        );
    }
}
