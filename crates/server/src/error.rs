use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use descriptor::DescriptorError;
use matcher::MatchError;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Match error: {0}")]
    Match(#[from] MatchError),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Index(_) => StatusCode::BAD_GATEWAY,
            ServerError::Match(err) => match err {
                MatchError::InvalidRequest(_) | MatchError::Descriptor(_) => {
                    StatusCode::BAD_REQUEST
                }
                MatchError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
                MatchError::Index(_) => StatusCode::BAD_GATEWAY,
                MatchError::InvalidConfig(_) | MatchError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Index(_) => "INDEX_ERROR",
            ServerError::Match(MatchError::DeadlineExceeded { .. }) => "DEADLINE_EXCEEDED",
            ServerError::Match(MatchError::Descriptor(_))
            | ServerError::Match(MatchError::InvalidRequest(_)) => "INVALID_QUERY",
            ServerError::Match(_) => "MATCH_ERROR",
            ServerError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    /// Map query-building failures to client-facing messages.
    pub fn from_query(err: MatchError) -> Self {
        match err {
            MatchError::Descriptor(DescriptorError::Decode(_)) => {
                ServerError::BadRequest("Failed to decode image".to_string())
            }
            other => ServerError::Match(other),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        ServerError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// Only raised while serializing responses; request bodies are rejected
/// by their extractors.
impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Internal(format!("serialization failed: {err}"))
    }
}
