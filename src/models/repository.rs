//! Repository data models and source analysis request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a repository record from the database.
///
/// # Database Table
///
/// Maps to the `repositories` table. The name is the final component of the
/// repository path and identifies the repository in every other request.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Repository {
    pub name: String,

    /// Filesystem path the repository was processed from
    pub path: String,

    /// https URL of the first git remote, if any
    pub url: Option<String>,

    /// HEAD commit at the time the source graph was built
    pub commit_hash: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to build the code graph of a local repository.
///
/// # JSON Example
///
/// ```json
/// {
///   "repo": "/home/dev/projects/code_graph",
///   "ignore": ["./.github", "./sbin", "./deps"]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ProcessLocalRepoRequest {
    /// Absolute path to the repository (required)
    pub repo: Option<String>,

    /// Repository-relative directories to skip
    #[serde(default)]
    pub ignore: Option<Vec<String>>,
}

/// Body of requests that only name a repository.
#[derive(Debug, Deserialize)]
pub struct RepoRequest {
    pub repo: Option<String>,
}

/// Query string of `GET` endpoints that only name a repository.
#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub repo: Option<String>,
}

/// Summary returned after a repository has been analyzed.
#[derive(Debug, Serialize)]
pub struct AnalysisSummary {
    pub repo: String,
    pub commit: String,
    pub files: usize,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Serialize)]
pub struct RepositoryList {
    pub repositories: Vec<String>,
}

/// Graph size and provenance of a repository.
///
/// # JSON Example
///
/// ```json
/// {
///   "node_count": 518,
///   "edge_count": 1290,
///   "repo_url": "https://github.com/falkordb/code_graph",
///   "commit": "3f1c0e..."
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct RepoInfo {
    pub node_count: i64,
    pub edge_count: i64,
    pub repo_url: Option<String>,
    pub commit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepoInfoResponse {
    pub info: RepoInfo,
}
