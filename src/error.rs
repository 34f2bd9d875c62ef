use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TriageError>;

/// Error type shared by the query core, the agent tools and both transports
#[derive(Error, Debug)]
pub enum TriageError {
    /// Missing or malformed caller input (empty query, bad body, bad enum value)
    #[error("{0}")]
    InvalidInput(String),

    /// The backing feedback collection is missing
    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Semantic index failure; recovered by the search fallback, never returned to callers
    #[error("Semantic search error: {0}")]
    Semantic(String),

    /// Text generation failure
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TriageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TriageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TriageError::NotFound(_) => StatusCode::NOT_FOUND,
            TriageError::Generation(_) => StatusCode::BAD_GATEWAY,
            TriageError::Semantic(_) => StatusCode::BAD_GATEWAY,
            TriageError::Storage(_)
            | TriageError::Serialization(_)
            | TriageError::Config(_)
            | TriageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used as the `error` field of HTTP error bodies
    pub fn label(&self) -> &'static str {
        match self {
            TriageError::InvalidInput(_) => "Invalid request",
            TriageError::NotFound(_) => "Feedback data not found",
            TriageError::Generation(_) => "Summary generation failed",
            TriageError::Semantic(_) => "Semantic search failed",
            TriageError::Storage(_) => "Storage failure",
            TriageError::Serialization(_) => "Serialization failure",
            TriageError::Config(_) => "Configuration error",
            TriageError::Internal(_) => "Internal error",
        }
    }
}

impl IntoResponse for TriageError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), details = %details, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), details = %details, "Request rejected");
        }

        let body = Json(json!({
            "error": self.label(),
            "details": details,
        }));

        (status, body).into_response()
    }
}
