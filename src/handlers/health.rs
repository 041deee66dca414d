//! Health check endpoint for service monitoring.
//!
//! The only route that does not use the `{"status": "success", ...}`
//! envelope, so monitors can read `status` directly.

use crate::{db::DbPool, error::AppError};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,

    /// Number of repositories with a stored graph or history
    pub repositories: i64,

    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "repositories": 3,
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// An unreachable database yields the standard 500 `internal_error` body.
pub async fn health_check(State(pool): State<DbPool>) -> Result<Json<HealthResponse>, AppError> {
    let repositories: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repositories")
        .fetch_one(&pool)
        .await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        database: "connected",
        repositories,
        timestamp: Utc::now(),
    }))
}
