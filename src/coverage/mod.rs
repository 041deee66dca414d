//! Code coverage ingestion.

pub mod lcov;

use std::path::Path;

use crate::paths::FileLocation;

/// Maps an lcov `SF:` path onto the repository-relative location used by
/// `File` nodes.
///
/// The configured prefix (typically the CI checkout directory) is removed
/// first, then the repository's own path when the report uses absolute local
/// paths. Whatever remains is treated as relative to the repository root.
pub fn source_location(
    source_file: &str,
    strip_prefix: Option<&str>,
    repo_path: &str,
) -> Option<FileLocation> {
    let mut path = source_file;

    if let Some(prefix) = strip_prefix.filter(|p| !p.is_empty()) {
        path = path.strip_prefix(prefix).unwrap_or(path);
    }

    let repo_path = repo_path.trim_end_matches('/');
    if !repo_path.is_empty() {
        if let Some(rest) = path.strip_prefix(repo_path) {
            if rest.is_empty() || rest.starts_with('/') {
                path = rest;
            }
        }
    }

    FileLocation::from_relative(Path::new(path))
}
