//! Repository HTTP handlers.
//!
//! This module implements repository-level API endpoints:
//! - POST /process_local_repo - Build the code graph of a local repository
//! - GET /list_repos - Names of processed repositories
//! - POST /repo_info - Graph size, remote URL and commit of a repository

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        repository::{
            AnalysisSummary, ProcessLocalRepoRequest, RepoInfoResponse, RepoRequest,
            RepositoryList,
        },
        required,
        response::ApiResponse,
    },
    services::{analysis_service, graph_service},
};
use axum::{Json, extract::State};

/// Analyze a repository on the server's filesystem.
///
/// # Request Body
///
/// ```json
/// {
///   "repo": "/home/dev/projects/code_graph",
///   "ignore": ["./.github", "./sbin"]
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "status": "success",
///   "repo": "code_graph",
///   "commit": "3f1c0e...",
///   "files": 42,
///   "nodes": 518,
///   "edges": 1290
/// }
/// ```
///
/// # Errors
///
/// - 400 `missing_parameter`: `repo` absent
/// - 400 `processing_failed`: path missing, not a directory, or not a git repository
pub async fn process_local_repo(
    State(pool): State<DbPool>,
    Json(request): Json<ProcessLocalRepoRequest>,
) -> Result<Json<ApiResponse<AnalysisSummary>>, AppError> {
    let repo = required(request.repo, "repo")?;
    let ignore = request.ignore.unwrap_or_default();

    let summary = analysis_service::process_local_repo(&pool, &repo, &ignore).await?;

    Ok(Json(ApiResponse::success(summary)))
}

/// List processed repositories.
///
/// # Response (200)
///
/// ```json
/// { "status": "success", "repositories": ["code_graph", "flask"] }
/// ```
pub async fn list_repos(
    State(pool): State<DbPool>,
) -> Result<Json<ApiResponse<RepositoryList>>, AppError> {
    let repositories = graph_service::list_repositories(&pool).await?;

    Ok(Json(ApiResponse::success(RepositoryList { repositories })))
}

/// Graph size of a repository, its remote URL and the commit its graph was
/// built from.
///
/// # Response (200)
///
/// ```json
/// {
///   "status": "success",
///   "info": {
///     "node_count": 518,
///     "edge_count": 1290,
///     "repo_url": "https://github.com/falkordb/code_graph",
///     "commit": "3f1c0e..."
///   }
/// }
/// ```
///
/// # Errors
///
/// - 400 `missing_parameter`: `repo` absent
/// - 404 `repository_not_found`: the repository was never processed
pub async fn repo_info(
    State(pool): State<DbPool>,
    Json(request): Json<RepoRequest>,
) -> Result<Json<ApiResponse<RepoInfoResponse>>, AppError> {
    let repo = required(request.repo, "repo")?;

    let info = graph_service::repository_info(&pool, &repo).await?;

    Ok(Json(ApiResponse::success(RepoInfoResponse { info })))
}
