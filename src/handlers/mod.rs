//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Extracts and validates request fields (JSON body or query string)
//! 2. Delegates to a service
//! 3. Wraps the result in the success envelope

/// Coverage ingestion endpoint
pub mod coverage;
/// Graph query endpoints
pub mod graph;
/// Service health endpoint
pub mod health;
/// Commit history endpoints
pub mod history;
/// Repository analysis and listing endpoints
pub mod repositories;
