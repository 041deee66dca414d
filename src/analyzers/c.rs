//! C analyzer built on tree-sitter.
//!
//! Records function definitions (return type and parameters), struct
//! definitions (fields) and calls through a plain identifier. Calls through
//! function pointers or member expressions have no resolvable name and are
//! skipped.

use std::path::Path;

use tree_sitter::{Node, Parser};

use super::{
    AnalysisError, Argument, Call, Definition, EntityKind, ParsedFile, SourceAnalyzer, line,
    walk_tree,
};

pub const EXTENSIONS: &[&str] = &[".c", ".h"];

pub struct CAnalyzer {
    parser: Parser,
}

impl CAnalyzer {
    pub fn new() -> Result<Self, AnalysisError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_c::language())?;
        Ok(Self { parser })
    }
}

impl SourceAnalyzer for CAnalyzer {
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

/// Name of a declarator and the type suffix its wrappers add.
///
/// `*name` gives `("name", "*")`, `name[8]` gives `("name", "[]")`. Abstract
/// declarators (`int *` in a prototype) have no name.
struct Declared<'t> {
    name: Option<Node<'t>>,
    suffix: String,
}

fn unwrap_declarator(node: Node<'_>) -> Declared<'_> {
    let mut suffix = String::new();
    let mut current = Some(node);

    while let Some(node) = current {
        match node.kind() {
            "identifier" | "field_identifier" | "type_identifier" => {
                return Declared {
                    name: Some(node),
                    suffix,
                };
            }
            "pointer_declarator" | "abstract_pointer_declarator" => {
                suffix.push('*');
                current = node.child_by_field_name("declarator");
            }
            "array_declarator" | "abstract_array_declarator" => {
                suffix.push_str("[]");
                current = node.child_by_field_name("declarator");
            }
            "function_declarator" => current = node.child_by_field_name("declarator"),
            "parenthesized_declarator" => current = node.named_child(0),
            other => {
                tracing::trace!("Unknown declarator node type: {}", other);
                break;
            }
        }
    }

    Declared { name: None, suffix }
}

struct Visitor<'a> {
    source: &'a str,
    parsed: ParsedFile,
}

impl<'a> Visitor<'a> {
    /// Functions open a scope for the calls inside them; structs do not.
    fn enter(&mut self, node: Node<'_>, scope: Option<usize>) -> Option<usize> {
        match node.kind() {
            "function_definition" => {
                if let Some(definition) = self.function_definition(node, scope) {
                    return Some(self.push(definition));
                }
            }
            "struct_specifier" => {
                if let Some(definition) = self.struct_specifier(node, scope) {
                    self.push(definition);
                }
            }
            "call_expression" => {
                let callee = node
                    .child_by_field_name("function")
                    .filter(|f| f.kind() == "identifier");
                if let Some(callee) = callee {
                    self.parsed.calls.push(Call {
                        caller: scope,
                        callee: self.text(callee),
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

    fn is_const(&self, node: Node<'_>) -> bool {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .any(|child| child.kind() == "type_qualifier" && self.text(child) == "const")
    }

    /// Comment directly above a top-level definition.
    fn comment_before(&self, node: Node<'_>) -> Option<String> {
        let anchor = match node.parent() {
            Some(parent) if matches!(parent.kind(), "declaration" | "type_definition") => parent,
            _ => node,
        };
        anchor
            .prev_named_sibling()
            .filter(|sibling| sibling.kind() == "comment")
            .map(|comment| self.text(comment))
    }

    fn function_definition(&self, node: Node<'_>, parent: Option<usize>) -> Option<Definition> {
        // `char *name(...)` wraps the function declarator in pointer declarators
        let mut pointers = String::new();
        let mut declarator = node.child_by_field_name("declarator")?;
        while declarator.kind() == "pointer_declarator" {
            pointers.push('*');
            declarator = declarator.child_by_field_name("declarator")?;
        }
        if declarator.kind() != "function_declarator" {
            return None;
        }

        let name = unwrap_declarator(declarator.child_by_field_name("declarator")?).name?;
        let name = self.text(name);
        tracing::debug!("Function declaration: {}", name);

        let ret_type = node
            .child_by_field_name("type")
            .map(|t| format!("{}{}", self.text(t), pointers));
        let args = declarator
            .child_by_field_name("parameters")
            .map(|params| self.parameters(params))
            .unwrap_or_default();

        Some(Definition {
            kind: EntityKind::Function,
            name,
            doc: self.comment_before(node),
            src: Some(self.text(node)),
            ret_type,
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
            match param.kind() {
                "parameter_declaration" => {
                    let type_ = param
                        .child_by_field_name("type")
                        .map(|t| self.text(t))
                        .unwrap_or_default();
                    let declared = param.child_by_field_name("declarator").map(unwrap_declarator);

                    let (name, suffix) = match declared {
                        Some(Declared { name, suffix }) => {
                            (name.map(|n| self.text(n)).unwrap_or_default(), suffix)
                        }
                        // f(void)
                        None if type_ == "void" => continue,
                        None => (String::new(), String::new()),
                    };

                    let qualifier = if self.is_const(param) { "const " } else { "" };
                    args.push(Argument::new(
                        name,
                        Some(format!("{qualifier}{type_}{suffix}")),
                    ));
                }
                "variadic_parameter" => args.push(Argument::new("...", None)),
                other => tracing::trace!("Unknown function parameter node type: {}", other),
            }
        }

        args
    }

    /// Struct with a body; `typedef struct { ... } name;` takes the typedef name.
    fn struct_specifier(&self, node: Node<'_>, parent: Option<usize>) -> Option<Definition> {
        let body = node.child_by_field_name("body")?;

        let name = match node.child_by_field_name("name") {
            Some(name) => self.text(name),
            None => {
                let typedef = node.parent().filter(|p| p.kind() == "type_definition")?;
                self.text(unwrap_declarator(typedef.child_by_field_name("declarator")?).name?)
            }
        };
        tracing::debug!("Struct declaration: {}", name);

        Some(Definition {
            kind: EntityKind::Struct,
            name,
            doc: self.comment_before(node),
            src: None,
            ret_type: None,
            args: self.fields(body),
            superclasses: Vec::new(),
            src_start: line(node.start_position().row),
            src_end: line(node.end_position().row),
            parent,
        })
    }

    fn fields(&self, body: Node<'_>) -> Vec<Argument> {
        let mut fields = Vec::new();
        let mut cursor = body.walk();

        for declaration in body.named_children(&mut cursor) {
            if declaration.kind() != "field_declaration" {
                continue;
            }
            let Some(type_node) = declaration.child_by_field_name("type") else {
                continue;
            };
            let qualifier = if self.is_const(declaration) { "const " } else { "" };
            let type_ = format!("{qualifier}{}", self.text(type_node));

            let mut declarators = declaration.walk();
            for declarator in declaration.children_by_field_name("declarator", &mut declarators) {
                let Declared { name, suffix } = unwrap_declarator(declarator);
                if let Some(name) = name {
                    fields.push(Argument::new(self.text(name), Some(format!("{type_}{suffix}"))));
                }
            }
        }

        fields
    }
}
