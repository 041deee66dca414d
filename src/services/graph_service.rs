//! Graph service - Storage and retrieval of repository code graphs.
//!
//! This service handles:
//! - Replacing a repository's graph with a freshly analyzed one
//! - Repository lookup and listing
//! - Sub-graph, neighbor and prefix queries over stored nodes
//! - Call paths between two nodes and nodes without incoming edges
//!
//! # Atomicity Guarantees
//!
//! A graph is written inside a single PostgreSQL transaction. Readers see
//! either the previous graph or the new one, never a mix of both.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use sqlx::PgConnection;

use crate::{
    db::DbPool,
    error::AppError,
    git::RepositoryInfo,
    graph::{CodeGraph, Label, Node, Relation},
    models::{
        graph::{EdgeRecord, GraphEdge, GraphNode, NodeRecord, PathElement, SubGraph},
        repository::{RepoInfo, Repository},
    },
};

const NODE_COLUMNS: &str = "id, label, name, path, ext, doc, src, ret_type, args, fields, \
                            src_start, src_end, coverage_percentage";

/// Create the repository row or refresh it.
///
/// `url` and `commit_hash` only overwrite stored values when present, so
/// recording history does not erase the commit the graph was built from.
pub(crate) async fn upsert_repository(
    conn: &mut PgConnection,
    name: &str,
    path: &str,
    url: Option<&str>,
    commit_hash: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO repositories (name, path, url, commit_hash)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE
        SET path = EXCLUDED.path,
            url = COALESCE(EXCLUDED.url, repositories.url),
            commit_hash = COALESCE(EXCLUDED.commit_hash, repositories.commit_hash),
            updated_at = NOW()
        "#,
    )
    .bind(name)
    .bind(path)
    .bind(url)
    .bind(commit_hash)
    .execute(conn)
    .await?;

    Ok(())
}

/// Replace the stored graph of a repository.
///
/// # Process
///
/// 1. Start database transaction
/// 2. Upsert the repository row with its HEAD commit and remote URL
/// 3. Delete the previous nodes (edges cascade)
/// 4. Insert files and placeholders, then the entities defined in files,
///    translating file indices to row ids
/// 5. Insert edges
/// 6. Commit
pub async fn store_graph(
    pool: &DbPool,
    name: &str,
    path: &str,
    info: &RepositoryInfo,
    graph: &CodeGraph,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    upsert_repository(&mut *tx, name, path, info.url.as_deref(), Some(&info.head)).await?;

    sqlx::query("DELETE FROM graph_nodes WHERE repo = $1")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    // Entities reference the row id of their file, so files go in first
    let (unowned, owned): (Vec<usize>, Vec<usize>) =
        (0..graph.nodes.len()).partition(|&index| graph.nodes[index].file.is_none());

    let mut ids: Vec<i64> = vec![0; graph.nodes.len()];

    let file_ids = vec![None; unowned.len()];
    let inserted = insert_nodes(&mut *tx, name, graph, &unowned, &file_ids).await?;
    for (&index, id) in unowned.iter().zip(inserted) {
        ids[index] = id;
    }

    let file_ids: Vec<Option<i64>> = owned
        .iter()
        .map(|&index| graph.nodes[index].file.map(|file| ids[file]))
        .collect();
    let inserted = insert_nodes(&mut *tx, name, graph, &owned, &file_ids).await?;
    for (&index, id) in owned.iter().zip(inserted) {
        ids[index] = id;
    }

    let mut relations = Vec::with_capacity(graph.edges.len());
    let mut src_ids = Vec::with_capacity(graph.edges.len());
    let mut dest_ids = Vec::with_capacity(graph.edges.len());
    let mut positions = Vec::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        relations.push(edge.relation.as_str());
        src_ids.push(ids[edge.src]);
        dest_ids.push(ids[edge.dest]);
        positions.push(edge.pos.map(line_number));
    }

    sqlx::query(
        r#"
        INSERT INTO graph_edges (repo, relation, src_id, dest_id, pos)
        SELECT $1, e.relation, e.src_id, e.dest_id, e.pos
        FROM UNNEST($2::text[], $3::bigint[], $4::bigint[], $5::int[])
            AS e(relation, src_id, dest_id, pos)
        ON CONFLICT (src_id, dest_id, relation) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(&relations)
    .bind(&src_ids)
    .bind(&dest_ids)
    .bind(&positions)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        "Stored graph of {}: {} nodes, {} edges",
        name,
        ids.len(),
        relations.len()
    );

    Ok(())
}

/// Insert the nodes at `indices` in one statement.
///
/// Returns their row ids in the order of `indices`.
async fn insert_nodes(
    conn: &mut PgConnection,
    repo: &str,
    graph: &CodeGraph,
    indices: &[usize],
    file_ids: &[Option<i64>],
) -> Result<Vec<i64>, AppError> {
    if indices.is_empty() {
        return Ok(Vec::new());
    }

    let nodes: Vec<&Node> = indices.iter().map(|&index| &graph.nodes[index]).collect();

    let mut labels = Vec::with_capacity(nodes.len());
    let mut names = Vec::with_capacity(nodes.len());
    let mut paths = Vec::with_capacity(nodes.len());
    let mut exts = Vec::with_capacity(nodes.len());
    let mut docs = Vec::with_capacity(nodes.len());
    let mut srcs = Vec::with_capacity(nodes.len());
    let mut ret_types = Vec::with_capacity(nodes.len());
    let mut args: Vec<Option<Value>> = Vec::with_capacity(nodes.len());
    let mut fields: Vec<Option<Value>> = Vec::with_capacity(nodes.len());
    let mut starts = Vec::with_capacity(nodes.len());
    let mut ends = Vec::with_capacity(nodes.len());

    for node in &nodes {
        labels.push(node.label.as_str());
        names.push(node.name.as_str());
        paths.push(node.path.as_str());
        exts.push(node.ext.as_deref());
        docs.push(node.doc.as_deref());
        srcs.push(node.src.as_deref());
        ret_types.push(node.ret_type.as_deref());
        match node.label {
            Label::Function => {
                args.push(serde_json::to_value(&node.args).ok());
                fields.push(None);
            }
            Label::Struct => {
                args.push(None);
                fields.push(serde_json::to_value(&node.args).ok());
            }
            Label::File | Label::Class => {
                args.push(None);
                fields.push(None);
            }
        }
        starts.push(node.src_start.map(line_number));
        ends.push(node.src_end.map(line_number));
    }

    let mut ids: Vec<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO graph_nodes (
            repo, label, name, path, ext, doc, src, ret_type, args, fields,
            src_start, src_end, file_id
        )
        SELECT $1, n.label, n.name, n.path, n.ext, n.doc, n.src, n.ret_type, n.args, n.fields,
               n.src_start, n.src_end, n.file_id
        FROM UNNEST(
            $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], $7::text[],
            $8::text[], $9::jsonb[], $10::jsonb[], $11::int[], $12::int[], $13::bigint[]
        ) WITH ORDINALITY
            AS n(label, name, path, ext, doc, src, ret_type, args, fields,
                 src_start, src_end, file_id, position)
        ORDER BY n.position
        RETURNING id
        "#,
    )
    .bind(repo)
    .bind(&labels)
    .bind(&names)
    .bind(&paths)
    .bind(&exts)
    .bind(&docs)
    .bind(&srcs)
    .bind(&ret_types)
    .bind(&args)
    .bind(&fields)
    .bind(&starts)
    .bind(&ends)
    .bind(file_ids)
    .fetch_all(&mut *conn)
    .await?;

    // Sequence values are drawn in insertion order, which follows `position`
    ids.sort_unstable();

    Ok(ids)
}

/// Fetch a repository by name.
///
/// # Errors
///
/// - `RepositoryNotFound`: the repository was never processed
pub async fn get_repository(pool: &DbPool, name: &str) -> Result<Repository, AppError> {
    sqlx::query_as::<_, Repository>("SELECT * FROM repositories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::RepositoryNotFound(name.to_string()))
}

pub async fn list_repositories(pool: &DbPool) -> Result<Vec<String>, AppError> {
    let names = sqlx::query_scalar("SELECT name FROM repositories ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(names)
}

/// Graph size of a repository together with its remote URL and the commit
/// the graph was built from.
pub async fn repository_info(pool: &DbPool, name: &str) -> Result<RepoInfo, AppError> {
    let repository = get_repository(pool, name).await?;

    let (node_count, edge_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM graph_nodes WHERE repo = $1),
            (SELECT COUNT(*) FROM graph_edges WHERE repo = $1)
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(RepoInfo {
        node_count,
        edge_count,
        repo_url: repository.url,
        commit: repository.commit_hash,
    })
}

/// Up to `limit` nodes of a repository together with the edges among them.
pub async fn sub_graph(pool: &DbPool, name: &str, limit: i64) -> Result<SubGraph, AppError> {
    get_repository(pool, name).await?;

    let nodes = sqlx::query_as::<_, NodeRecord>(&format!(
        "SELECT {NODE_COLUMNS} FROM graph_nodes WHERE repo = $1 ORDER BY id LIMIT $2"
    ))
    .bind(name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = nodes.iter().map(|n| n.id).collect();
    let edges = sqlx::query_as::<_, EdgeRecord>(
        r#"
        SELECT id, relation, src_id, dest_id, pos
        FROM graph_edges
        WHERE repo = $1 AND src_id = ANY($2) AND dest_id = ANY($2)
        ORDER BY id
        "#,
    )
    .bind(name)
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    Ok(into_sub_graph(nodes, edges))
}

/// Nodes reachable from `node_id` over one outgoing edge, and those edges.
///
/// An unknown node id yields an empty result.
pub async fn neighbors(pool: &DbPool, name: &str, node_id: i64) -> Result<SubGraph, AppError> {
    get_repository(pool, name).await?;

    let edges = sqlx::query_as::<_, EdgeRecord>(
        r#"
        SELECT id, relation, src_id, dest_id, pos
        FROM graph_edges
        WHERE repo = $1 AND src_id = $2
        ORDER BY id
        "#,
    )
    .bind(name)
    .bind(node_id)
    .fetch_all(pool)
    .await?;

    let dest_ids: Vec<i64> = edges
        .iter()
        .map(|e| e.dest_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let nodes = sqlx::query_as::<_, NodeRecord>(&format!(
        "SELECT {NODE_COLUMNS} FROM graph_nodes WHERE id = ANY($1) ORDER BY id"
    ))
    .bind(&dest_ids)
    .fetch_all(pool)
    .await?;

    Ok(into_sub_graph(nodes, edges))
}

/// Classes, structs and functions whose name starts with `prefix`, ignoring case.
pub async fn prefix_search(
    pool: &DbPool,
    name: &str,
    prefix: &str,
    limit: i64,
) -> Result<Vec<GraphNode>, AppError> {
    get_repository(pool, name).await?;

    let nodes = sqlx::query_as::<_, NodeRecord>(&format!(
        r#"
        SELECT {NODE_COLUMNS}
        FROM graph_nodes
        WHERE repo = $1
          AND label IN ('Class', 'Function', 'Struct')
          AND starts_with(lower(name), lower($2))
        ORDER BY label, name, id
        LIMIT $3
        "#
    ))
    .bind(name)
    .bind(prefix)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(nodes.into_iter().map(GraphNode::from).collect())
}

/// Call paths from `src` to `dest`, shortest first.
///
/// Each path alternates nodes and `CALLS` edges, starting with `src` and
/// ending with `dest`. No node repeats within a path, except `dest` closing a
/// cycle when it equals `src`. The walk stops after `max_length` edges and
/// `limit` paths.
pub async fn find_paths(
    pool: &DbPool,
    name: &str,
    src: i64,
    dest: i64,
    max_length: i32,
    limit: i64,
) -> Result<Vec<Vec<PathElement>>, AppError> {
    get_repository(pool, name).await?;

    let walks: Vec<(Vec<i64>, Vec<i64>)> = sqlx::query_as(
        r#"
        WITH RECURSIVE walk (last_id, node_ids, edge_ids) AS (
            SELECT e.dest_id, ARRAY[e.src_id, e.dest_id], ARRAY[e.id]
            FROM graph_edges e
            WHERE e.repo = $1 AND e.relation = 'CALLS' AND e.src_id = $2
          UNION ALL
            SELECT e.dest_id, w.node_ids || e.dest_id, w.edge_ids || e.id
            FROM walk w
            JOIN graph_edges e ON e.src_id = w.last_id AND e.relation = 'CALLS'
            WHERE w.last_id <> $3
              AND cardinality(w.edge_ids) < $4
              AND (e.dest_id = $3 OR e.dest_id <> ALL(w.node_ids))
        )
        SELECT node_ids, edge_ids
        FROM walk
        WHERE last_id = $3
        LIMIT $5
        "#,
    )
    .bind(name)
    .bind(src)
    .bind(dest)
    .bind(max_length)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    if walks.is_empty() {
        return Ok(Vec::new());
    }

    let node_ids: Vec<i64> = walks
        .iter()
        .flat_map(|(nodes, _)| nodes.iter().copied())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let edge_ids: Vec<i64> = walks
        .iter()
        .flat_map(|(_, edges)| edges.iter().copied())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let nodes: HashMap<i64, GraphNode> = sqlx::query_as::<_, NodeRecord>(&format!(
        "SELECT {NODE_COLUMNS} FROM graph_nodes WHERE id = ANY($1)"
    ))
    .bind(&node_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|record| (record.id, GraphNode::from(record)))
    .collect();

    let edges: HashMap<i64, GraphEdge> = sqlx::query_as::<_, EdgeRecord>(
        "SELECT id, relation, src_id, dest_id, pos FROM graph_edges WHERE id = ANY($1)",
    )
    .bind(&edge_ids)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|record| (record.id, GraphEdge::from(record)))
    .collect();

    let mut paths = Vec::with_capacity(walks.len());
    for (walk_nodes, walk_edges) in &walks {
        let mut path = Vec::with_capacity(walk_nodes.len() + walk_edges.len());
        for (position, node_id) in walk_nodes.iter().enumerate() {
            if let Some(node) = nodes.get(node_id) {
                path.push(PathElement::Node(node.clone()));
            }
            if let Some(edge) = walk_edges.get(position).and_then(|id| edges.get(id)) {
                path.push(PathElement::Edge(edge.clone()));
            }
        }
        paths.push(path);
    }

    Ok(paths)
}

/// Nodes with no incoming edge.
///
/// `label` restricts the nodes considered; `relation` restricts which
/// incoming edges count. With no relation, any incoming edge makes a node
/// reachable.
pub async fn unreachable_nodes(
    pool: &DbPool,
    name: &str,
    label: Option<Label>,
    relation: Option<Relation>,
) -> Result<Vec<GraphNode>, AppError> {
    get_repository(pool, name).await?;

    let nodes = sqlx::query_as::<_, NodeRecord>(&format!(
        r#"
        SELECT {NODE_COLUMNS}
        FROM graph_nodes n
        WHERE n.repo = $1
          AND ($2::text IS NULL OR n.label = $2)
          AND NOT EXISTS (
              SELECT 1
              FROM graph_edges e
              WHERE e.dest_id = n.id
                AND ($3::text IS NULL OR e.relation = $3)
          )
        ORDER BY n.id
        "#
    ))
    .bind(name)
    .bind(label.map(|l| l.as_str()))
    .bind(relation.map(|r| r.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(nodes.into_iter().map(GraphNode::from).collect())
}

fn into_sub_graph(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> SubGraph {
    SubGraph {
        nodes: nodes.into_iter().map(GraphNode::from).collect(),
        edges: edges.into_iter().map(GraphEdge::from).collect(),
    }
}

fn line_number(line: u32) -> i32 {
    i32::try_from(line).unwrap_or(i32::MAX)
}
