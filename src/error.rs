//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{analyzers::AnalysisError, coverage::lcov::LcovError};

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Request Errors**: Missing or malformed request fields
/// - **Processing Errors**: The repository, lcov file or git history could not be read
/// - **Resource Errors**: Requested repository has never been processed
/// - **Internal Errors**: Database and task failures (details are logged, not returned)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A mandatory request parameter was not supplied.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Missing mandatory parameter \"{0}\"")]
    MissingParameter(&'static str),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// The repository path does not exist or is not a directory.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Failed to process repository: {0}")]
    InvalidRepositoryPath(String),

    /// Reading or walking the filesystem failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// libgit2 could not open or read the repository.
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// The source tree could not be analyzed.
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    /// The lcov report is malformed.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid coverage report: {0}")]
    Coverage(#[from] LcovError),

    /// No repository with this name has been processed.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Missing project {0}")]
    RepositoryNotFound(String),

    /// A blocking analysis task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `MissingParameter`, `InvalidRequest` → 400 Bad Request
/// - `InvalidRepositoryPath`, `Io`, `Git`, `Analysis` → 400 Bad Request (`processing_failed`)
/// - `Coverage` → 400 Bad Request
/// - `RepositoryNotFound` → 404 Not Found
/// - `Database`, `Task` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::MissingParameter(_) => (
                StatusCode::BAD_REQUEST,
                "missing_parameter",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::InvalidRepositoryPath(_)
            | AppError::Io(_)
            | AppError::Git(_)
            | AppError::Analysis(_) => {
                tracing::warn!("Processing failed: {}", self);
                (
                    StatusCode::BAD_REQUEST,
                    "processing_failed",
                    self.to_string(),
                )
            }
            AppError::Coverage(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_coverage_report",
                self.to_string(),
            ),
            AppError::RepositoryNotFound(_) => (
                StatusCode::NOT_FOUND,
                "repository_not_found",
                self.to_string(),
            ),
            AppError::Database(_) | AppError::Task(_) => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
