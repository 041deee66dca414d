//! Source analyzers.
//!
//! An analyzer turns one source file into a [`ParsedFile`]: the classes,
//! structs and functions it defines and the calls it makes. [`analyze_repository`] walks
//! a repository, runs the analyzer registered for each file extension and
//! assembles the results into a [`CodeGraph`].

pub mod c;
pub mod python;

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::graph::CodeGraph;
use crate::paths::{FileLocation, IgnoreList};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("failed to load grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("parser produced no syntax tree for {0}")]
    Parse(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Class,
    Function,
    Struct,
}

/// Function argument or struct field: `{name, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    /// Declared type, `"Unknown"` when absent
    #[serde(rename = "type")]
    pub type_: String,
}

impl Argument {
    pub fn new(name: impl Into<String>, type_: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_: type_.unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

/// A class, struct or function definition found in a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub kind: EntityKind,
    pub name: String,
    pub doc: Option<String>,
    pub src: Option<String>,
    pub ret_type: Option<String>,
    /// Parameters of a function, fields of a struct
    pub args: Vec<Argument>,
    /// Names of base classes, classes only
    pub superclasses: Vec<String>,
    /// 1-based first line
    pub src_start: u32,
    /// 1-based last line
    pub src_end: u32,
    /// Index of the enclosing definition; `None` means the file itself
    pub parent: Option<usize>,
}

/// A call site whose callee could be named.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Index of the enclosing definition; `None` for module-level code
    pub caller: Option<usize>,
    pub callee: String,
    /// 1-based line of the call
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub definitions: Vec<Definition>,
    pub calls: Vec<Call>,
}

pub trait SourceAnalyzer: Send {
    /// File extensions (with leading dot) this analyzer handles.
    fn extensions(&self) -> &'static [&'static str];

    fn parse(&mut self, path: &Path, source: &str) -> Result<ParsedFile, AnalysisError>;
}

/// Pre-order walk of the syntax tree under `root`.
///
/// `enter` receives each node with the scope of its parent and returns the
/// scope its children see. Uses a cursor and an explicit scope stack, so
/// deeply nested expressions do not grow the call stack.
pub(crate) fn walk_tree<'t, S: Copy>(
    root: Node<'t>,
    scope: S,
    mut enter: impl FnMut(Node<'t>, S) -> S,
) {
    let mut cursor = root.walk();
    let mut scopes = vec![enter(root, scope)];

    loop {
        let Some(&current) = scopes.last() else {
            return;
        };
        if cursor.goto_first_child() {
            scopes.push(enter(cursor.node(), current));
            continue;
        }

        // climb until some ancestor has a next sibling
        loop {
            scopes.pop();
            let Some(&parent) = scopes.last() else {
                return;
            };
            if cursor.goto_next_sibling() {
                scopes.push(enter(cursor.node(), parent));
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// 1-based line of a tree-sitter row.
pub(crate) fn line(row: usize) -> u32 {
    u32::try_from(row).map_or(u32::MAX, |row| row.saturating_add(1))
}

/// Analyzers for every supported language.
pub fn analyzers() -> Result<Vec<Box<dyn SourceAnalyzer>>, AnalysisError> {
    Ok(vec![
        Box::new(python::PythonAnalyzer::new()?),
        Box::new(c::CAnalyzer::new()?),
    ])
}

/// Extensions (with leading dot) that have an analyzer.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    python::EXTENSIONS.iter().chain(c::EXTENSIONS).copied()
}

/// Lists files under `root` that have an analyzer, skipping ignored paths and
/// `.git`. Returned paths are relative to `root`, sorted.
pub fn collect_source_files(root: &Path, ignore: &IgnoreList) -> Result<Vec<PathBuf>, AnalysisError> {
    let walk_root = root.to_path_buf();
    let ignore = ignore.clone();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(move |entry| {
            if entry.file_name() == ".git" {
                return false;
            }
            match entry.path().strip_prefix(&walk_root) {
                Ok(relative) if !relative.as_os_str().is_empty() => {
                    if ignore.is_ignored(relative) {
                        tracing::info!("Ignoring {}", relative.display());
                        return false;
                    }
                    true
                }
                _ => true,
            }
        })
        .build();

    let extensions: Vec<&str> = supported_extensions().collect();
    let mut files = Vec::new();

    for entry in walker {
        let entry = entry.map_err(|source| AnalysisError::Walk {
            path: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|s| s[1..] == *ext));
        if !supported {
            tracing::trace!("Skipping unsupported file {}", path.display());
            continue;
        }

        if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Parses every supported file of the repository at `root` and builds its
/// code graph.
///
/// Files that cannot be read as UTF-8 are skipped with a warning; the rest of
/// the repository is still analyzed.
pub fn analyze_repository(root: &Path, ignore: &IgnoreList) -> Result<CodeGraph, AnalysisError> {
    let mut analyzers = analyzers()?;
    let files = collect_source_files(root, ignore)?;
    tracing::info!("Analyzing {} source files under {}", files.len(), root.display());

    let mut parsed_files = Vec::with_capacity(files.len());

    for relative in files {
        let Some(location) = FileLocation::from_relative(&relative) else {
            continue;
        };

        let Some(analyzer) = analyzers
            .iter_mut()
            .find(|a| a.extensions().contains(&location.ext.as_str()))
        else {
            continue;
        };

        let source = match std::fs::read_to_string(root.join(&relative)) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", relative.display(), e);
                continue;
            }
        };

        tracing::debug!("Processing file: {}", relative.display());
        let parsed = analyzer.parse(&relative, &source)?;
        parsed_files.push((location, parsed));
    }

    let graph = CodeGraph::build(&parsed_files);
    tracing::info!(
        "Built code graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    Ok(graph)
}
