//! Graph node and edge rows, and the JSON shape clients receive.
//!
//! Nodes are returned as `{id, labels, properties}` and edges as
//! `{id, relation, src_node, dest_node, properties}`; absent properties are
//! left out rather than sent as `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Represents a row of the `graph_nodes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NodeRecord {
    pub id: i64,
    pub label: String,
    pub name: String,
    pub path: String,
    pub ext: Option<String>,
    pub doc: Option<String>,
    pub src: Option<String>,
    pub ret_type: Option<String>,
    pub args: Option<Value>,
    pub fields: Option<Value>,
    pub src_start: Option<i32>,
    pub src_end: Option<i32>,
    pub coverage_percentage: Option<f64>,
}

/// Represents a row of the `graph_edges` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EdgeRecord {
    pub id: i64,
    pub relation: String,
    pub src_id: i64,
    pub dest_id: i64,
    pub pos: Option<i32>,
}

/// Line span of a function, used to compute its coverage.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FunctionSpan {
    pub id: i64,
    pub src_start: Option<i32>,
    pub src_end: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: Map<String, Value>,
}

impl From<NodeRecord> for GraphNode {
    fn from(record: NodeRecord) -> Self {
        let mut properties = Map::new();
        properties.insert("name".into(), record.name.into());
        properties.insert("path".into(), record.path.into());

        let optional = [
            ("ext", record.ext.map(Value::from)),
            ("doc", record.doc.map(Value::from)),
            ("src", record.src.map(Value::from)),
            ("ret_type", record.ret_type.map(Value::from)),
            ("args", record.args),
            ("fields", record.fields),
            ("src_start", record.src_start.map(Value::from)),
            ("src_end", record.src_end.map(Value::from)),
            (
                "coverage_percentage",
                record.coverage_percentage.map(Value::from),
            ),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                properties.insert(key.into(), value);
            }
        }

        Self {
            id: record.id,
            labels: vec![record.label],
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: i64,
    pub relation: String,
    pub src_node: i64,
    pub dest_node: i64,
    pub properties: Map<String, Value>,
}

impl From<EdgeRecord> for GraphEdge {
    fn from(record: EdgeRecord) -> Self {
        let mut properties = Map::new();
        if let Some(pos) = record.pos {
            properties.insert("pos".into(), pos.into());
        }

        Self {
            id: record.id,
            relation: record.relation,
            src_node: record.src_id,
            dest_node: record.dest_id,
            properties,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SubGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Serialize)]
pub struct GraphEntities {
    pub entities: SubGraph,
}

#[derive(Debug, Serialize)]
pub struct Neighbors {
    pub neighbors: SubGraph,
}

#[derive(Debug, Serialize)]
pub struct Completions {
    pub completions: Vec<GraphNode>,
}

/// One step of a call path: a node, or the `CALLS` edge to the next node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PathElement {
    Node(GraphNode),
    Edge(GraphEdge),
}

#[derive(Debug, Serialize)]
pub struct Paths {
    pub paths: Vec<Vec<PathElement>>,
}

#[derive(Debug, Serialize)]
pub struct Unreachables {
    pub unreachables: Vec<GraphNode>,
}

/// Query string of `GET /get_neighbors`.
///
/// `node_id` is kept as text so a non-integer value can be reported as an
/// invalid request rather than a generic query rejection.
#[derive(Debug, Deserialize)]
pub struct NeighborsQuery {
    pub repo: Option<String>,
    pub node_id: Option<String>,
}

/// Request body of `POST /auto_complete`.
#[derive(Debug, Deserialize)]
pub struct AutoCompleteRequest {
    pub repo: Option<String>,
    pub prefix: Option<String>,
}

/// Request body of `POST /find_paths`.
///
/// Node ids stay untyped so a non-integer id is reported as an invalid
/// request rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct FindPathsRequest {
    pub repo: Option<String>,
    pub src: Option<Value>,
    pub dest: Option<Value>,
}

/// Request body of `POST /unreachable`.
#[derive(Debug, Deserialize)]
pub struct UnreachableRequest {
    pub repo: Option<String>,
    /// Only consider nodes with this label
    pub label: Option<String>,
    /// Only incoming edges of this relation make a node reachable
    pub relation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_encoding_skips_absent_properties() {
        let record = NodeRecord {
            id: 7,
            label: "Function".into(),
            name: "greet".into(),
            path: "app/models.py".into(),
            ext: None,
            doc: None,
            src: Some("def greet(self): ...".into()),
            ret_type: None,
            args: Some(json!([{"name": "self", "type": "Unknown"}])),
            fields: None,
            src_start: Some(2),
            src_end: Some(3),
            coverage_percentage: Some(0.5),
        };

        let node = serde_json::to_value(GraphNode::from(record)).unwrap();

        assert_eq!(
            node,
            json!({
                "id": 7,
                "labels": ["Function"],
                "properties": {
                    "name": "greet",
                    "path": "app/models.py",
                    "src": "def greet(self): ...",
                    "args": [{"name": "self", "type": "Unknown"}],
                    "src_start": 2,
                    "src_end": 3,
                    "coverage_percentage": 0.5
                }
            })
        );
    }

    #[test]
    fn edge_encoding_carries_call_position() {
        let edge = GraphEdge::from(EdgeRecord {
            id: 1,
            relation: "CALLS".into(),
            src_id: 2,
            dest_id: 3,
            pos: Some(14),
        });

        assert_eq!(
            serde_json::to_value(edge).unwrap(),
            json!({
                "id": 1,
                "relation": "CALLS",
                "src_node": 2,
                "dest_node": 3,
                "properties": {"pos": 14}
            })
        );
    }

    #[test]
    fn path_elements_encode_without_a_tag() {
        let node = GraphNode {
            id: 1,
            labels: vec!["Function".into()],
            properties: Map::new(),
        };
        let edge = GraphEdge::from(EdgeRecord {
            id: 5,
            relation: "CALLS".into(),
            src_id: 1,
            dest_id: 1,
            pos: None,
        });

        let path = vec![
            PathElement::Node(node.clone()),
            PathElement::Edge(edge),
            PathElement::Node(node),
        ];

        assert_eq!(
            serde_json::to_value(path).unwrap(),
            json!([
                {"id": 1, "labels": ["Function"], "properties": {}},
                {"id": 5, "relation": "CALLS", "src_node": 1, "dest_node": 1, "properties": {}},
                {"id": 1, "labels": ["Function"], "properties": {}}
            ])
        );
    }
}
