//! Success envelope.

use serde::Serialize;

/// Every successful response carries `"status": "success"` next to the
/// endpoint's own fields.
///
/// ```json
/// {
///   "status": "success",
///   "repositories": ["code_graph"]
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,

    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}
