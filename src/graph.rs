//! In-memory code graph built from parsed source files.
//!
//! Analysis runs on the blocking pool and produces a [`CodeGraph`]; the graph
//! service then writes it to PostgreSQL in a single transaction. Nodes refer
//! to each other by index into [`CodeGraph::nodes`].

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analyzers::{Argument, Definition, EntityKind, ParsedFile};
use crate::paths::FileLocation;

/// Path given to entities that are referenced but never defined in the
/// repository (library functions, external base classes).
pub const EXTERNAL_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    File,
    Class,
    Function,
    Struct,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::File => "File",
            Label::Class => "Class",
            Label::Function => "Function",
            Label::Struct => "Struct",
        }
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "File" => Ok(Label::File),
            "Class" => Ok(Label::Class),
            "Function" => Ok(Label::Function),
            "Struct" => Ok(Label::Struct),
            other => Err(format!("unknown label {other}")),
        }
    }
}

impl From<EntityKind> for Label {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Class => Label::Class,
            EntityKind::Function => Label::Function,
            EntityKind::Struct => Label::Struct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    Defines,
    Calls,
    Inherits,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Defines => "DEFINES",
            Relation::Calls => "CALLS",
            Relation::Inherits => "INHERITS",
        }
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFINES" => Ok(Relation::Defines),
            "CALLS" => Ok(Relation::Calls),
            "INHERITS" => Ok(Relation::Inherits),
            other => Err(format!("unknown relation {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub label: Label,
    pub name: String,
    /// Directory for files, file path for entities, [`EXTERNAL_PATH`] for placeholders
    pub path: String,
    pub ext: Option<String>,
    pub doc: Option<String>,
    pub src: Option<String>,
    pub ret_type: Option<String>,
    /// Function parameters, or struct fields
    pub args: Vec<Argument>,
    pub src_start: Option<u32>,
    pub src_end: Option<u32>,
    /// Index of the `File` node the entity is defined in
    pub file: Option<usize>,
}

impl Node {
    fn file(location: &FileLocation) -> Self {
        Self {
            label: Label::File,
            name: location.name.clone(),
            path: location.dir.clone(),
            ext: Some(location.ext.clone()),
            doc: None,
            src: None,
            ret_type: None,
            args: Vec::new(),
            src_start: None,
            src_end: None,
            file: None,
        }
    }

    fn entity(definition: &Definition, path: &str, file: usize) -> Self {
        Self {
            label: definition.kind.into(),
            name: definition.name.clone(),
            path: path.to_string(),
            ext: None,
            doc: definition.doc.clone(),
            src: definition.src.clone(),
            ret_type: definition.ret_type.clone(),
            args: definition.args.clone(),
            src_start: Some(definition.src_start),
            src_end: Some(definition.src_end),
            file: Some(file),
        }
    }

    fn placeholder(label: Label, name: &str) -> Self {
        Self {
            label,
            name: name.to_string(),
            path: EXTERNAL_PATH.to_string(),
            ext: None,
            doc: None,
            src: None,
            ret_type: None,
            args: Vec::new(),
            src_start: Some(0),
            src_end: Some(0),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub relation: Relation,
    pub src: usize,
    pub dest: usize,
    /// Line of the call site for `CALLS` edges
    pub pos: Option<u32>,
}

#[derive(Debug, Default)]
pub struct CodeGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    edge_keys: HashSet<(usize, usize, Relation)>,
    functions: HashMap<String, usize>,
    classes: HashMap<String, usize>,
}

impl CodeGraph {
    /// Builds the graph from every parsed file of a repository.
    ///
    /// Definitions are added for all files before any call or superclass is
    /// resolved, so references across files find their targets regardless of
    /// walk order.
    pub fn build(files: &[(FileLocation, ParsedFile)]) -> Self {
        let mut graph = CodeGraph::default();

        // Node index of each definition, per file
        let mut definition_nodes = Vec::with_capacity(files.len());
        let mut file_nodes = Vec::with_capacity(files.len());

        for (location, parsed) in files {
            let file = graph.add_node(Node::file(location));
            file_nodes.push(file);

            let path = location.relative_path();
            let mut ids = Vec::with_capacity(parsed.definitions.len());
            for definition in &parsed.definitions {
                let id = graph.add_node(Node::entity(definition, &path, file));
                let parent = definition.parent.map(|p| ids[p]).unwrap_or(file);
                graph.connect(Relation::Defines, parent, id, None);
                ids.push(id);
            }
            definition_nodes.push(ids);
        }

        for ((_, parsed), (ids, file)) in files
            .iter()
            .zip(definition_nodes.iter().zip(file_nodes.iter()))
        {
            for (definition, &id) in parsed.definitions.iter().zip(ids.iter()) {
                for superclass in &definition.superclasses {
                    let base = graph.resolve_class(superclass);
                    graph.connect(Relation::Inherits, id, base, None);
                }
            }

            for call in &parsed.calls {
                let caller = call.caller.map(|c| ids[c]).unwrap_or(*file);
                let callee = graph.resolve_callee(&call.callee);
                graph.connect(Relation::Calls, caller, callee, Some(call.line));
            }
        }

        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.label == Label::File).count()
    }

    /// Looks up the first node with this label and name.
    pub fn find(&self, label: Label, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.label == label && n.name == name)
    }

    pub fn has_edge(&self, relation: Relation, src: usize, dest: usize) -> bool {
        self.edge_keys.contains(&(src, dest, relation))
    }

    fn add_node(&mut self, node: Node) -> usize {
        let id = self.nodes.len();
        match node.label {
            Label::Function => {
                self.functions.entry(node.name.clone()).or_insert(id);
            }
            Label::Class => {
                self.classes.entry(node.name.clone()).or_insert(id);
            }
            Label::File | Label::Struct => {}
        }
        self.nodes.push(node);
        id
    }

    fn connect(&mut self, relation: Relation, src: usize, dest: usize, pos: Option<u32>) {
        if self.edge_keys.insert((src, dest, relation)) {
            self.edges.push(Edge {
                relation,
                src,
                dest,
                pos,
            });
        }
    }

    /// A call resolves to a function first, then to a class (instantiation).
    /// Unknown names become a single external function placeholder.
    fn resolve_callee(&mut self, name: &str) -> usize {
        if let Some(&id) = self.functions.get(name) {
            return id;
        }
        if let Some(&id) = self.classes.get(name) {
            return id;
        }
        tracing::debug!("Creating missing Class/Function {}", name);
        self.add_node(Node::placeholder(Label::Function, name))
    }

    fn resolve_class(&mut self, name: &str) -> usize {
        if let Some(&id) = self.classes.get(name) {
            return id;
        }
        tracing::debug!("Creating missing base class {}", name);
        self.add_node(Node::placeholder(Label::Class, name))
    }
}
