//! Tree-sitter based parser for preprocessed C
//!
//! Splits a preprocessed translation unit into its top-level declarations,
//! in source order, each with a name and a re-renderable text.

use dstbind_core::{
    Declaration, Error, FuncDecl, Location, Result, TypeDecl, TypeKind, VarDecl,
};
use tree_sitter::{Node, Parser as TSParser};
use tracing::{debug, warn};

use crate::preprocessor::SourceMap;
use crate::ParseResult;

/// Syntax errors listed in a parse failure before truncating
const MAX_REPORTED_ERRORS: usize = 5;

/// Tree-sitter based parser
pub struct TreeSitterParser {
    parser: TSParser,
}

impl TreeSitterParser {
    /// Create a new Tree-sitter parser for C
    pub fn new() -> Self {
        let mut parser = TSParser::new();
        parser
            .set_language(&tree_sitter_c::LANGUAGE.into())
            .expect("Failed to load C grammar");
        Self { parser }
    }

    /// Parse preprocessed code into top-level declarations.
    ///
    /// Directive lines are blanked before parsing; line markers among them
    /// give each declaration the file and line it came from. `origin` names
    /// the code when it carries no markers.
    pub fn parse_source(&mut self, code: &str, origin: &str) -> Result<ParseResult> {
        let (source, map) = SourceMap::strip(code);
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| Error::Parse(format!("{}: parser produced no tree", origin)))?;

        let extractor = Extractor {
            source: &source,
            map: &map,
            origin,
        };

        let root = tree.root_node();
        if root.has_error() {
            return Err(Error::Parse(extractor.describe_errors(root)));
        }

        let mut result = ParseResult::default();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            extractor.visit_top_level(node, &mut result)?;
        }

        debug!(
            "Parsed {} declarations from {} ({} skipped)",
            result.declarations.len(),
            origin,
            result.skipped.len()
        );
        Ok(result)
    }
}

impl Default for TreeSitterParser {
    fn default() -> Self {
        Self::new()
    }
}

struct Extractor<'a> {
    source: &'a str,
    map: &'a SourceMap,
    origin: &'a str,
}

impl<'a> Extractor<'a> {
    /// Anything at file scope that is not a declaration is a parse error,
    /// except comments and empty statements.
    fn visit_top_level(&self, node: Node, result: &mut ParseResult) -> Result<()> {
        match node.kind() {
            "type_definition" => self.extract_typedefs(node, result),
            "declaration" => self.extract_declaration(node, result),
            "function_definition" => self.extract_function_definition(node, result),
            "struct_specifier" | "union_specifier" | "enum_specifier" => {
                self.extract_tagged_type(node, result)
            }
            "comment" => {}
            "expression_statement" if node.named_child_count() == 0 => {}
            // `int;` and similar declare nothing
            "primitive_type" | "sized_type_specifier" | "type_identifier" => {
                let location = self.location(node);
                warn!("Skipping empty declaration at {}", location);
                result.skipped.push(format!("empty declaration at {}", location));
            }
            other => {
                return Err(Error::Parse(format!(
                    "{}: unexpected {} `{}` at file scope",
                    self.location(node),
                    other,
                    snippet(self.node_text(node))
                )));
            }
        }
        Ok(())
    }

    fn extract_typedefs(&self, node: Node, result: &mut ParseResult) {
        let declarators = field_children(node, "declarator");
        let rendered = self.render_declarators(node, &declarators, true);

        for (declarator, text) in declarators.iter().zip(rendered) {
            let Some(name) = self.declarator_name(*declarator) else {
                result.skipped.push(format!("typedef at {}", self.location(node)));
                continue;
            };
            debug!("Found typedef: {}", name);
            result.declarations.push(Declaration::Type(TypeDecl {
                name,
                kind: TypeKind::Typedef,
                text,
                location: Some(self.location(node)),
            }));
        }
    }

    fn extract_declaration(&self, node: Node, result: &mut ParseResult) {
        let declarators = field_children(node, "declarator");
        if declarators.is_empty() {
            result.skipped.push(format!("declaration at {}", self.location(node)));
            return;
        }

        let storage = self.storage_classes(node);
        let rendered = self.render_declarators(node, &declarators, false);

        for (declarator, text) in declarators.iter().zip(rendered) {
            let Some(name) = self.declarator_name(*declarator) else {
                result.skipped.push(format!("declaration at {}", self.location(node)));
                continue;
            };
            let location = Some(self.location(node));

            let decl = if declares_function(*declarator) {
                debug!("Found function: {}", name);
                Declaration::Function(FuncDecl {
                    name,
                    storage: storage.clone(),
                    text,
                    is_definition: false,
                    location,
                })
            } else {
                debug!("Found variable: {}", name);
                Declaration::Variable(VarDecl {
                    name,
                    storage: storage.clone(),
                    text,
                    location,
                })
            };
            result.declarations.push(decl);
        }
    }

    fn extract_function_definition(&self, node: Node, result: &mut ParseResult) {
        let name = node
            .child_by_field_name("declarator")
            .and_then(|d| self.declarator_name(d));
        let Some(name) = name else {
            result.skipped.push(format!("function definition at {}", self.location(node)));
            return;
        };

        debug!("Found function definition: {}", name);
        result.declarations.push(Declaration::Function(FuncDecl {
            name,
            storage: self.storage_classes(node),
            text: self.node_text(node).to_string(),
            is_definition: true,
            location: Some(self.location(node)),
        }));
    }

    fn extract_tagged_type(&self, node: Node, result: &mut ParseResult) {
        let kind = match node.kind() {
            "struct_specifier" => TypeKind::Struct,
            "union_specifier" => TypeKind::Union,
            _ => TypeKind::Enum,
        };
        let name = node
            .child_by_field_name("name")
            .map(|n| self.node_text(n).to_string())
            .unwrap_or_default();

        debug!("Found {:?}: {}", kind, name);
        result.declarations.push(Declaration::Type(TypeDecl {
            name,
            kind,
            text: format!("{};", self.node_text(node)),
            location: Some(self.location(node)),
        }));
    }

    /// One rendering per declarator of a typedef or declaration.
    ///
    /// A single declarator keeps the item verbatim. With several, each gets
    /// the shared specifiers; a tag body is emitted with the first only.
    fn render_declarators(&self, node: Node, declarators: &[Node], is_typedef: bool) -> Vec<String> {
        if declarators.len() == 1 {
            return vec![self.node_text(node).to_string()];
        }

        let first = declarators[0];
        let prefix = self.source[node.start_byte()..first.start_byte()].trim_end();
        let mut rendered = vec![format!("{} {};", prefix, self.node_text(first))];

        let later_prefix = match node.child_by_field_name("type") {
            Some(spec) if spec.child_by_field_name("body").is_some() => {
                match spec.child_by_field_name("name") {
                    Some(tag) => format!(
                        "{}{} {}{}",
                        &self.source[node.start_byte()..spec.start_byte()],
                        spec.kind().trim_end_matches("_specifier"),
                        self.node_text(tag),
                        &self.source[spec.end_byte()..first.start_byte()],
                    )
                    .trim_end()
                    .to_string(),
                    // Later aliases can only name the first one when it is
                    // the plain struct type, not a pointer or array of it
                    None if is_typedef && is_plain_name(first) => {
                        format!("typedef {}", self.node_text(first))
                    }
                    None => prefix.to_string(),
                }
            }
            _ => prefix.to_string(),
        };

        for declarator in &declarators[1..] {
            rendered.push(format!("{} {};", later_prefix, self.node_text(*declarator)));
        }
        rendered
    }

    fn storage_classes(&self, node: Node) -> Vec<String> {
        let mut cursor = node.walk();
        let storage = node
            .children(&mut cursor)
            .filter(|c| c.kind() == "storage_class_specifier")
            .map(|c| self.node_text(c).to_string())
            .collect();
        storage
    }

    /// Identifier a declarator chain ends in
    fn declarator_name(&self, declarator: Node) -> Option<String> {
        let mut current = declarator;
        loop {
            match current.kind() {
                "identifier" | "type_identifier" | "field_identifier" | "primitive_type" => {
                    return Some(self.node_text(current).to_string());
                }
                _ => current = inner_declarator(current)?,
            }
        }
    }

    fn describe_errors(&self, root: Node) -> String {
        let mut problems = Vec::new();
        let mut total = 0;
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                total += 1;
                if problems.len() < MAX_REPORTED_ERRORS {
                    let location = self.location(node);
                    if node.is_missing() {
                        problems.push(format!("{}: missing `{}`", location, node.kind()));
                    } else {
                        problems.push(format!(
                            "{}: unexpected `{}`",
                            location,
                            snippet(self.node_text(node))
                        ));
                    }
                }
                continue;
            }
            if node.has_error() {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }

        let mut message = problems.join("; ");
        if total > problems.len() {
            message.push_str(&format!(" (and {} more)", total - problems.len()));
        }
        if message.is_empty() {
            message = format!("{}: syntax error", self.origin);
        }
        message
    }

    fn location(&self, node: Node) -> Location {
        let position = node.start_position();
        match self.map.locate(position.row) {
            Some((file, line)) => Location::new(file, line, position.column as u32),
            None => Location::new(self.origin, position.row as u32 + 1, position.column as u32),
        }
    }

    fn node_text(&self, node: Node) -> &'a str {
        &self.source[node.start_byte()..node.end_byte()]
    }
}

fn is_plain_name(declarator: Node) -> bool {
    matches!(declarator.kind(), "type_identifier" | "primitive_type")
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// Next declarator inward, or the identifier it wraps
fn inner_declarator(node: Node) -> Option<Node> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| {
        c.kind().ends_with("_declarator")
            || matches!(c.kind(), "identifier" | "type_identifier" | "field_identifier")
    });
    found
}

/// Whether a declarator declares a function rather than a variable.
///
/// True when the identifier is wrapped directly by a function declarator,
/// looking through parentheses and attributes: `int *f(void)` is a
/// function, `int (*f)(void)` a function pointer variable.
fn declares_function(declarator: Node) -> bool {
    let mut current = declarator;
    let mut innermost = "";
    loop {
        match current.kind() {
            "identifier" => return innermost == "function_declarator",
            "parenthesized_declarator" | "attributed_declarator" | "init_declarator" => {}
            kind => innermost = kind,
        }
        match inner_declarator(current) {
            Some(next) => current = next,
            None => return false,
        }
    }
}

fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > 40 {
        format!("{}...", line.chars().take(40).collect::<String>())
    } else {
        line.to_string()
    }
}
