//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They run repository analysis off the async runtime and own every
//! database transaction.

pub mod analysis_service;
pub mod coverage_service;
pub mod graph_service;
pub mod history_service;
