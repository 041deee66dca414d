//! Data models representing database rows and API request/response bodies.

/// Commit history rows and requests
pub mod commit;
/// Coverage ingestion requests
pub mod coverage;
/// Graph node/edge rows and their JSON encoding
pub mod graph;
/// Repository rows and source analysis requests
pub mod repository;
/// Success envelope shared by all endpoints
pub mod response;

use crate::error::AppError;

/// Unwraps a mandatory request field. Absent and blank values are both
/// reported as missing.
pub fn required(value: Option<String>, name: &'static str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::MissingParameter(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_accepts_present_values() {
        assert_eq!(required(Some("repo".into()), "repo").unwrap(), "repo");
    }

    #[test]
    fn required_rejects_absent_and_blank_values() {
        assert!(matches!(
            required(None, "repo"),
            Err(AppError::MissingParameter("repo"))
        ));
        assert!(matches!(
            required(Some("   ".into()), "lcov"),
            Err(AppError::MissingParameter("lcov"))
        ));
    }
}
