use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use models::{ErrorKind, ModelError};
use serde_json::{Value, json};

/// Errors surfaced by the HTTP layer.
///
/// Every variant becomes a JSON body `{"error": {"kind", "message"}}`.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Alignment(String),

    #[error("{0}")]
    BadRequest(String),

    /// A required artifact is not loaded
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Alignment(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Kind label reported to clients
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not found",
            ApiError::Alignment(_) => "alignment error",
            ApiError::BadRequest(_) => "bad request",
            ApiError::Unavailable(_) | ApiError::Internal(_) => "internal error",
        }
    }

    pub fn body(&self) -> Value {
        json!({
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        let message = err.to_string();
        match err {
            ModelError::MissingArtifact(_) => ApiError::Unavailable(message),
            _ => match err.kind() {
                ErrorKind::NotFound | ErrorKind::Unmapped => ApiError::NotFound(message),
                ErrorKind::Alignment => ApiError::Alignment(message),
                ErrorKind::Data | ErrorKind::Internal => ApiError::Internal(message),
            },
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        }
        let body = Json(json!({ "error": self.body() }));
        (self.status(), body).into_response()
    }
}

/// Error from the recommend endpoint, which always carries an empty list
#[derive(Debug)]
pub struct RecommendError(pub ApiError);

impl From<ApiError> for RecommendError {
    fn from(err: ApiError) -> Self {
        RecommendError(err)
    }
}

impl From<ModelError> for RecommendError {
    fn from(err: ModelError) -> Self {
        RecommendError(err.into())
    }
}

impl From<tokio::task::JoinError> for RecommendError {
    fn from(err: tokio::task::JoinError) -> Self {
        RecommendError(err.into())
    }
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), "{}", self.0);
        }
        let body = Json(json!({
            "recommendations": [],
            "error": self.0.body(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
