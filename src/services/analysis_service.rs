//! Analysis service - Builds and stores the source graph of a local repository.

use std::path::PathBuf;

use crate::{
    analyzers,
    db::DbPool,
    error::AppError,
    git,
    models::repository::AnalysisSummary,
    paths::{self, IgnoreList},
    services::graph_service,
};

/// Resolve a client-supplied repository path.
///
/// # Returns
///
/// The canonical path and the name the repository is stored under.
///
/// # Errors
///
/// - `InvalidRepositoryPath`: the path does not exist or is not a directory
pub(crate) async fn resolve_repository_path(repo: &str) -> Result<(PathBuf, String), AppError> {
    let invalid = || AppError::InvalidRepositoryPath(repo.to_string());

    let path = tokio::fs::canonicalize(repo).await.map_err(|_| invalid())?;
    let metadata = tokio::fs::metadata(&path).await.map_err(|_| invalid())?;
    if !metadata.is_dir() {
        return Err(invalid());
    }

    let name = paths::repository_name(&path).ok_or_else(invalid)?;
    Ok((path, name))
}

/// Analyze a local repository and replace its stored graph.
///
/// # Process
///
/// 1. Validate the repository path
/// 2. Read HEAD and remote URL, then parse every supported source file
///    (blocking, off the async runtime)
/// 3. Store the resulting graph in one transaction
///
/// # Errors
///
/// - `InvalidRepositoryPath`: path missing or not a directory
/// - `Git`: path is not a git repository or HEAD is unborn
/// - `Analysis`: the source tree could not be walked
/// - `Database`: storing the graph failed
pub async fn process_local_repo(
    pool: &DbPool,
    repo: &str,
    ignore: &[String],
) -> Result<AnalysisSummary, AppError> {
    let (path, name) = resolve_repository_path(repo).await?;
    tracing::info!("Processing local repository {} ({})", name, path.display());

    let ignore_list = IgnoreList::new(ignore);
    if !ignore_list.is_empty() {
        tracing::debug!("Ignoring {:?}", ignore);
    }
    let root = path.clone();
    let (info, graph) = tokio::task::spawn_blocking(move || -> Result<_, AppError> {
        let info = git::repository_info(&root)?;
        let graph = analyzers::analyze_repository(&root, &ignore_list)?;
        Ok((info, graph))
    })
    .await??;

    let path = path.to_string_lossy();
    graph_service::store_graph(pool, &name, &path, &info, &graph).await?;

    Ok(AnalysisSummary {
        repo: name,
        commit: info.head,
        files: graph.file_count(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    })
}
