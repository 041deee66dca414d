//! Commit history data models and request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a commit record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Commit {
    pub hash: String,
    pub author: String,
    pub message: String,
    #[serde(rename = "date")]
    pub committed_at: DateTime<Utc>,
}

/// Request to record the commit history of a local repository.
///
/// # JSON Example
///
/// ```json
/// {
///   "repo": "/home/dev/projects/code_graph",
///   "ignore": ["./vendor"]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ProcessGitHistoryRequest {
    /// Absolute path to the repository (required)
    pub repo: Option<String>,

    /// Repository-relative paths left out of per-commit file changes
    #[serde(default)]
    pub ignore: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct HistorySummary {
    pub repo: String,
    pub head: String,
    pub commits: usize,
    pub transitions: usize,
}

#[derive(Debug, Serialize)]
pub struct CommitList {
    pub commits: Vec<Commit>,
}
