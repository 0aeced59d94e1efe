//! Application error type and its HTTP mapping.
//!
//! Handlers return `Result<_, AppError>`; the `IntoResponse` impl turns
//! every variant into a JSON body with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// No learner row with the given id.
    #[error("Learner not found: {0}")]
    UnknownLearner(String),

    /// The learner exists but has not started a course yet.
    #[error("No active course for learner: {0}")]
    NoActiveCourse(String),

    /// The requested day has no stored material (not reached yet).
    #[error("Day {0} has not been generated yet")]
    DayNotReached(i64),

    /// All thirty days of this language are graded already.
    #[error("Training for {0} is already finished")]
    CourseFinished(String),

    /// Malformed or unusable request payload.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The generation pipeline ran out of attempts. The message carries
    /// the attempt count and the last upstream error verbatim.
    #[error("Generation error: {0}")]
    Generation(#[from] crate::orchestrator::OrchestratorError),

    /// SQLite failure while reading or writing training state.
    #[error("Persistence error: {0}")]
    Database(#[from] sqlx::Error),

    /// Catch-all for faults that should not happen in normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::UnknownLearner(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::NoActiveCourse(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::DayNotReached(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::CourseFinished(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Generation(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
