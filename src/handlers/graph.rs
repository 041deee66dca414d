//! Graph query HTTP handlers.
//!
//! - GET /graph_entities - A bounded sub-graph of a repository
//! - GET /get_neighbors - Outgoing neighbors of a node
//! - POST /auto_complete - Classes and functions matching a name prefix
//! - POST /find_paths - Call paths between two nodes
//! - POST /unreachable - Nodes without incoming edges

use crate::{
    db::DbPool,
    error::AppError,
    graph::{Label, Relation},
    models::{
        graph::{
            AutoCompleteRequest, Completions, FindPathsRequest, GraphEntities, Neighbors,
            NeighborsQuery, Paths, UnreachableRequest, Unreachables,
        },
        repository::RepoQuery,
        required,
        response::ApiResponse,
    },
    services::graph_service,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::Value;

const ENTITY_LIMIT: i64 = 100;
const COMPLETION_LIMIT: i64 = 10;
const MAX_PATH_LENGTH: i32 = 16;
const PATH_LIMIT: i64 = 100;

/// Up to 100 nodes of a repository and the edges among them.
///
/// # Response (200)
///
/// ```json
/// {
///   "status": "success",
///   "entities": {
///     "nodes": [{ "id": 1, "labels": ["File"], "properties": { "name": "app.py", "path": "src", "ext": ".py" } }],
///     "edges": []
///   }
/// }
/// ```
pub async fn graph_entities(
    State(pool): State<DbPool>,
    Query(query): Query<RepoQuery>,
) -> Result<Json<ApiResponse<GraphEntities>>, AppError> {
    let repo = required(query.repo, "repo")?;

    let entities = graph_service::sub_graph(&pool, &repo, ENTITY_LIMIT).await?;

    Ok(Json(ApiResponse::success(GraphEntities { entities })))
}

/// Nodes one outgoing edge away from `node_id`.
///
/// # Errors
///
/// - 400 `missing_parameter`: `repo` or `node_id` absent
/// - 400 `invalid_request`: `node_id` is not an integer
pub async fn get_neighbors(
    State(pool): State<DbPool>,
    Query(query): Query<NeighborsQuery>,
) -> Result<Json<ApiResponse<Neighbors>>, AppError> {
    let repo = required(query.repo, "repo")?;
    let node_id = required(query.node_id, "node_id")?;
    let node_id: i64 = node_id
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidRequest("node_id must be an integer".to_string()))?;

    let neighbors = graph_service::neighbors(&pool, &repo, node_id).await?;

    Ok(Json(ApiResponse::success(Neighbors { neighbors })))
}

/// Up to 10 classes and functions whose name starts with `prefix`.
///
/// # Request Body
///
/// ```json
/// { "repo": "code_graph", "prefix": "get_" }
/// ```
pub async fn auto_complete(
    State(pool): State<DbPool>,
    Json(request): Json<AutoCompleteRequest>,
) -> Result<Json<ApiResponse<Completions>>, AppError> {
    let repo = required(request.repo, "repo")?;
    let prefix = required(request.prefix, "prefix")?;

    let completions =
        graph_service::prefix_search(&pool, &repo, &prefix, COMPLETION_LIMIT).await?;

    Ok(Json(ApiResponse::success(Completions { completions })))
}

/// Call paths from `src` to `dest`, shortest first.
///
/// # Request Body
///
/// ```json
/// { "repo": "code_graph", "src": 12, "dest": 40 }
/// ```
///
/// # Response (200)
///
/// Each path alternates nodes and `CALLS` edges:
///
/// ```json
/// {
///   "status": "success",
///   "paths": [[
///     { "id": 12, "labels": ["Function"], "properties": { "name": "main", "path": "app.py" } },
///     { "id": 7, "relation": "CALLS", "src_node": 12, "dest_node": 40, "properties": { "pos": 3 } },
///     { "id": 40, "labels": ["Function"], "properties": { "name": "run", "path": "app.py" } }
///   ]]
/// }
/// ```
///
/// # Errors
///
/// - 400 `missing_parameter`: `repo`, `src` or `dest` absent
/// - 400 `invalid_request`: `src` or `dest` is not an integer
pub async fn find_paths(
    State(pool): State<DbPool>,
    Json(request): Json<FindPathsRequest>,
) -> Result<Json<ApiResponse<Paths>>, AppError> {
    let repo = required(request.repo, "repo")?;
    let src = node_id(request.src, "src")?;
    let dest = node_id(request.dest, "dest")?;

    let paths =
        graph_service::find_paths(&pool, &repo, src, dest, MAX_PATH_LENGTH, PATH_LIMIT).await?;

    Ok(Json(ApiResponse::success(Paths { paths })))
}

/// Nodes no edge points to, optionally narrowed by label and relation.
///
/// # Request Body
///
/// ```json
/// { "repo": "code_graph", "label": "Function", "relation": "CALLS" }
/// ```
///
/// # Errors
///
/// - 400 `missing_parameter`: `repo` absent
/// - 400 `invalid_request`: unknown `label` or `relation`
pub async fn unreachable(
    State(pool): State<DbPool>,
    Json(request): Json<UnreachableRequest>,
) -> Result<Json<ApiResponse<Unreachables>>, AppError> {
    let repo = required(request.repo, "repo")?;
    let label = request
        .label
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.parse::<Label>())
        .transpose()
        .map_err(AppError::InvalidRequest)?;
    let relation = request
        .relation
        .filter(|r| !r.trim().is_empty())
        .map(|r| r.parse::<Relation>())
        .transpose()
        .map_err(AppError::InvalidRequest)?;

    let unreachables = graph_service::unreachable_nodes(&pool, &repo, label, relation).await?;

    Ok(Json(ApiResponse::success(Unreachables { unreachables })))
}

fn node_id(value: Option<Value>, name: &'static str) -> Result<i64, AppError> {
    match value {
        None | Some(Value::Null) => Err(AppError::MissingParameter(name)),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| AppError::InvalidRequest(format!("{name} node id must be an integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_ids_must_be_integers() {
        assert_eq!(node_id(Some(json!(12)), "src").unwrap(), 12);
        assert!(matches!(
            node_id(None, "src"),
            Err(AppError::MissingParameter("src"))
        ));
        assert!(matches!(
            node_id(Some(json!("12")), "dest"),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            node_id(Some(json!(1.5)), "dest"),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
