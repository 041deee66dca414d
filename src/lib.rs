//! Code graph service.
//!
//! Builds a graph of files, classes, structs and functions from local git
//! repositories, enriches it with lcov coverage and commit history, and
//! serves it over a JSON HTTP API.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Source Analysis**: tree-sitter, run on blocking threads
//! - **Git Access**: libgit2 via git2
//! - **Format**: JSON requests/responses

pub mod analyzers;
pub mod config;
pub mod coverage;
pub mod db;
pub mod error;
pub mod git;
pub mod graph;
pub mod handlers;
pub mod models;
pub mod paths;
pub mod services;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{config::Config, db::DbPool};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Build the HTTP router with every route and the tracing layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Ingestion
        .route(
            "/process_local_repo",
            post(handlers::repositories::process_local_repo),
        )
        .route(
            "/process_code_coverage",
            post(handlers::coverage::process_code_coverage),
        )
        .route(
            "/process_git_history",
            post(handlers::history::process_git_history),
        )
        // Queries
        .route("/list_repos", get(handlers::repositories::list_repos))
        .route("/repo_info", post(handlers::repositories::repo_info))
        .route("/list_commits", post(handlers::history::list_commits))
        .route("/graph_entities", get(handlers::graph::graph_entities))
        .route("/get_neighbors", get(handlers::graph::get_neighbors))
        .route("/auto_complete", post(handlers::graph::auto_complete))
        .route("/find_paths", post(handlers::graph::find_paths))
        .route("/unreachable", post(handlers::graph::unreachable))
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
