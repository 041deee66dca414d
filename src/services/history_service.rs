//! History service - Records the first-parent commit history of a repository.

use crate::{
    db::DbPool,
    error::AppError,
    git::{self, history::collect_history},
    models::commit::{Commit, HistorySummary},
    paths::IgnoreList,
    services::{analysis_service::resolve_repository_path, graph_service},
};

/// Walk the history of a local repository and replace the stored one.
///
/// # Process
///
/// 1. Validate the repository path
/// 2. Walk first parents from HEAD, diffing each commit against its parent
///    (blocking, off the async runtime)
/// 3. In one transaction, upsert the repository, then replace its commits
///    and transitions
pub async fn process_git_history(
    pool: &DbPool,
    repo: &str,
    ignore: &[String],
) -> Result<HistorySummary, AppError> {
    let (path, name) = resolve_repository_path(repo).await?;
    tracing::info!("Processing git history of {} ({})", name, path.display());

    let ignore_list = IgnoreList::new(ignore);
    if !ignore_list.is_empty() {
        tracing::debug!("Ignoring {:?}", ignore);
    }
    let root = path.clone();
    let (info, history) = tokio::task::spawn_blocking(move || -> Result<_, git2::Error> {
        let info = git::repository_info(&root)?;
        let history = collect_history(&root, &ignore_list)?;
        Ok((info, history))
    })
    .await??;

    let mut tx = pool.begin().await?;

    let path = path.to_string_lossy();
    graph_service::upsert_repository(&mut *tx, &name, &path, info.url.as_deref(), None).await?;

    // Transitions cascade with their commits
    sqlx::query("DELETE FROM commits WHERE repo = $1")
        .bind(&name)
        .execute(&mut *tx)
        .await?;

    let mut hashes = Vec::with_capacity(history.commits.len());
    let mut authors = Vec::with_capacity(history.commits.len());
    let mut messages = Vec::with_capacity(history.commits.len());
    let mut dates = Vec::with_capacity(history.commits.len());
    let mut positions = Vec::with_capacity(history.commits.len());
    for (position, commit) in history.commits.iter().enumerate() {
        hashes.push(commit.hash.as_str());
        authors.push(commit.author.as_str());
        messages.push(commit.message.as_str());
        dates.push(commit.committed_at);
        positions.push(i32::try_from(position).unwrap_or(i32::MAX));
    }

    sqlx::query(
        r#"
        INSERT INTO commits (repo, hash, author, message, committed_at, position)
        SELECT $1, c.hash, c.author, c.message, c.committed_at, c.position
        FROM UNNEST($2::text[], $3::text[], $4::text[], $5::timestamptz[], $6::int[])
            AS c(hash, author, message, committed_at, position)
        "#,
    )
    .bind(&name)
    .bind(&hashes)
    .bind(&authors)
    .bind(&messages)
    .bind(&dates)
    .bind(&positions)
    .execute(&mut *tx)
    .await?;

    for transition in &history.transitions {
        sqlx::query(
            r#"
            INSERT INTO commit_transitions (repo, child_hash, parent_hash, added, deleted, modified)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&name)
        .bind(&transition.child)
        .bind(&transition.parent)
        .bind(sqlx::types::Json(&transition.added))
        .bind(sqlx::types::Json(&transition.deleted))
        .bind(sqlx::types::Json(&transition.modified))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "Stored {} commits and {} transitions for {}",
        history.commits.len(),
        history.transitions.len(),
        name
    );

    Ok(HistorySummary {
        repo: name,
        head: history.head,
        commits: history.commits.len(),
        transitions: history.transitions.len(),
    })
}

/// Commits of a repository, newest first.
///
/// # Errors
///
/// - `RepositoryNotFound`: the repository was never processed
pub async fn list_commits(pool: &DbPool, repo: &str) -> Result<Vec<Commit>, AppError> {
    graph_service::get_repository(pool, repo).await?;

    let commits = sqlx::query_as::<_, Commit>(
        r#"
        SELECT hash, author, message, committed_at
        FROM commits
        WHERE repo = $1
        ORDER BY position
        "#,
    )
    .bind(repo)
    .fetch_all(pool)
    .await?;

    Ok(commits)
}
