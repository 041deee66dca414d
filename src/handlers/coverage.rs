//! Coverage HTTP handler.
//!
//! - POST /process_code_coverage - Attach an lcov report to a repository

use std::sync::Arc;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::{
        coverage::{CoverageSummary, ProcessCodeCoverageRequest},
        required,
        response::ApiResponse,
    },
    services::coverage_service,
};
use axum::{Json, extract::State};

/// Apply an lcov tracefile to a processed repository.
///
/// # Request Body
///
/// ```json
/// {
///   "lcov": "/builds/code_graph/coverage.lcov",
///   "repo": "code_graph"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "status": "success",
///   "repo": "code_graph",
///   "files_updated": 12,
///   "functions_updated": 87,
///   "files_skipped": 1
/// }
/// ```
///
/// # Errors
///
/// - 400 `missing_parameter`: `lcov` or `repo` absent
/// - 400 `processing_failed`: tracefile unreadable
/// - 400 `invalid_coverage_report`: tracefile malformed
/// - 404 `repository_not_found`: repository never processed
pub async fn process_code_coverage(
    State(pool): State<DbPool>,
    State(config): State<Arc<Config>>,
    Json(request): Json<ProcessCodeCoverageRequest>,
) -> Result<Json<ApiResponse<CoverageSummary>>, AppError> {
    let lcov = required(request.lcov, "lcov")?;
    let repo = required(request.repo, "repo")?;

    let summary = coverage_service::process_code_coverage(
        &pool,
        config.coverage_path_prefix.as_deref(),
        &repo,
        &lcov,
    )
    .await?;

    Ok(Json(ApiResponse::success(summary)))
}
