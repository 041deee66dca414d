//! Python analyzer built on tree-sitter.

use std::path::Path;

use tree_sitter::{Node, Parser};

use super::{
    AnalysisError, Argument, Call, Definition, EntityKind, ParsedFile, SourceAnalyzer, line,
    walk_tree,
};

pub const EXTENSIONS: &[&str] = &[".py"];

pub struct PythonAnalyzer {
    parser: Parser,
}

impl PythonAnalyzer {
    pub fn new() -> Result<Self, AnalysisError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::language())?;
        Ok(Self { parser })
    }
}

impl SourceAnalyzer for PythonAnalyzer {
    fn extensions(&self) -> &'static [&'static str] {
        EXTENSIONS
    }

    fn parse(&mut self, path: &Path, source: &str) -> Result<ParsedFile, AnalysisError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| AnalysisError::Parse(path.to_path_buf()))?;

        let mut visitor = Visitor {
            source,
            parsed: ParsedFile::default(),
        };
        walk_tree(tree.root_node(), None, |node, scope| visitor.enter(node, scope));

        Ok(visitor.parsed)
    }
}

struct Visitor<'a> {
    source: &'a str,
    parsed: ParsedFile,
}

impl<'a> Visitor<'a> {
    /// Records `node` if it is a definition or a call. `scope` is the
    /// innermost enclosing definition; returns the scope for its children.
    fn enter(&mut self, node: Node<'_>, scope: Option<usize>) -> Option<usize> {
        match node.kind() {
            "class_definition" => {
                if let Some(definition) = self.class_definition(node, scope) {
                    return Some(self.push(definition));
                }
            }
            "function_definition" => {
                if let Some(definition) = self.function_definition(node, scope) {
                    return Some(self.push(definition));
                }
            }
            "call" => {
                if let Some(callee) = self.callee_name(node) {
                    self.parsed.calls.push(Call {
                        caller: scope,
                        callee,
                        line: line(node.start_position().row),
                    });
                }
            }
            _ => {}
        }
        scope
    }

    fn push(&mut self, definition: Definition) -> usize {
        self.parsed.definitions.push(definition);
        self.parsed.definitions.len() - 1
    }

    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or_default()
            .to_string()
    }

    fn class_definition(&self, node: Node<'_>, parent: Option<usize>) -> Option<Definition> {
        let name = self.text(node.child_by_field_name("name")?);
        tracing::debug!("Class declaration: {}", name);

        let mut superclasses = Vec::new();
        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            for base in bases.named_children(&mut cursor) {
                match base.kind() {
                    "identifier" => superclasses.push(self.text(base)),
                    "attribute" => {
                        if let Some(attr) = base.child_by_field_name("attribute") {
                            superclasses.push(self.text(attr));
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(Definition {
            kind: EntityKind::Class,
            name,
            doc: self.docstring(node),
            src: None,
            ret_type: None,
            args: Vec::new(),
            superclasses,
            src_start: line(node.start_position().row),
            src_end: line(node.end_position().row),
            parent,
        })
    }

    fn function_definition(&self, node: Node<'_>, parent: Option<usize>) -> Option<Definition> {
        let name = self.text(node.child_by_field_name("name")?);
        tracing::debug!("Function declaration: {}", name);

        let args = node
            .child_by_field_name("parameters")
            .map(|params| self.parameters(params))
            .unwrap_or_default();

        Some(Definition {
            kind: EntityKind::Function,
            name,
            doc: self.docstring(node),
            src: Some(self.text(node)),
            ret_type: node
                .child_by_field_name("return_type")
                .map(|t| self.text(t)),
            args,
            superclasses: Vec::new(),
            src_start: line(node.start_position().row),
            src_end: line(node.end_position().row),
            parent,
        })
    }

    fn parameters(&self, params: Node<'_>) -> Vec<Argument> {
        let mut args = Vec::new();
        let mut cursor = params.walk();

        for param in params.named_children(&mut cursor) {
            let arg = match param.kind() {
                "identifier" => Argument::new(self.text(param), None),
                "typed_parameter" => {
                    // the name is the first named child; it may be a splat pattern
                    let Some(name) = param.named_child(0) else {
                        continue;
                    };
                    let type_ = param.child_by_field_name("type").map(|t| self.text(t));
                    Argument::new(self.text(name), type_)
                }
                "default_parameter" | "typed_default_parameter" => {
                    let Some(name) = param.child_by_field_name("name") else {
                        continue;
                    };
                    let type_ = param.child_by_field_name("type").map(|t| self.text(t));
                    Argument::new(self.text(name), type_)
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    Argument::new(self.text(param), None)
                }
                other => {
                    tracing::trace!("Unknown function parameter node type: {}", other);
                    continue;
                }
            };
            args.push(arg);
        }

        args
    }

    /// First statement of the body when it is a bare string literal.
    fn docstring(&self, node: Node<'_>) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let literal = first.named_child(0)?;
        (literal.kind() == "string").then(|| self.text(literal))
    }

    /// `foo(...)` yields `foo`, `obj.method(...)` yields `method`.
    fn callee_name(&self, call: Node<'_>) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => Some(self.text(function)),
            "attribute" => function
                .child_by_field_name("attribute")
                .map(|attr| self.text(attr)),
            other => {
                tracing::trace!("Unknown function call pattern: {}", other);
                None
            }
        }
    }
}
