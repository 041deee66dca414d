//! Coverage ingestion request/response types.

use serde::{Deserialize, Serialize};

/// Request to attach an lcov report to a processed repository.
///
/// # JSON Example
///
/// ```json
/// {
///   "lcov": "/home/dev/projects/code_graph/coverage.lcov",
///   "repo": "code_graph"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ProcessCodeCoverageRequest {
    /// Path to the lcov tracefile (required)
    pub lcov: Option<String>,

    /// Name of a previously processed repository (required)
    pub repo: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CoverageSummary {
    pub repo: String,
    /// Records whose source file matched a `File` node
    pub files_updated: usize,
    pub functions_updated: usize,
    /// Records with no matching `File` node
    pub files_skipped: usize,
}
