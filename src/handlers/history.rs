//! Commit history HTTP handlers.
//!
//! - POST /process_git_history - Record the first-parent history of a repository
//! - POST /list_commits - Recorded commits, newest first

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        commit::{CommitList, HistorySummary, ProcessGitHistoryRequest},
        repository::RepoRequest,
        required,
        response::ApiResponse,
    },
    services::history_service,
};
use axum::{Json, extract::State};

/// Record the commit history of a local repository.
///
/// # Request Body
///
/// ```json
/// {
///   "repo": "/home/dev/projects/code_graph",
///   "ignore": ["./vendor"]
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "status": "success",
///   "repo": "code_graph",
///   "head": "3f1c0e...",
///   "commits": 120,
///   "transitions": 119
/// }
/// ```
pub async fn process_git_history(
    State(pool): State<DbPool>,
    Json(request): Json<ProcessGitHistoryRequest>,
) -> Result<Json<ApiResponse<HistorySummary>>, AppError> {
    let repo = required(request.repo, "repo")?;
    let ignore = request.ignore.unwrap_or_default();

    let summary = history_service::process_git_history(&pool, &repo, &ignore).await?;

    Ok(Json(ApiResponse::success(summary)))
}

pub async fn list_commits(
    State(pool): State<DbPool>,
    Json(request): Json<RepoRequest>,
) -> Result<Json<ApiResponse<CommitList>>, AppError> {
    let repo = required(request.repo, "repo")?;

    let commits = history_service::list_commits(&pool, &repo).await?;

    Ok(Json(ApiResponse::success(CommitList { commits })))
}
