//! Python extractor: dotted-module packages, imports, classes with
//! Protocol detection, decorator routes, router mounts, requests/httpx
//! client calls, and intra-file call edges.

mod http;

use std::collections::HashMap;

use carta_core::{Language, NodeType};
use tree_sitter::Node as TsNode;

use crate::builder::GraphBuilder;
use crate::extractor::{ExtractError, Extractor, ParseResult};
use crate::strings::unquote;
use crate::treesitter::{
    field_text, line_end, line_start, named_children, parse_source, signature_before_body, text,
    visit,
};

pub struct PythonExtractor;

const PY_BUILTINS: [&str; 24] = [
    "print", "len", "range", "str", "int", "float", "list", "dict", "set", "tuple",
    "isinstance", "enumerate", "zip", "map", "filter", "open", "super", "getattr", "setattr",
    "hasattr", "type", "sorted", "min", "max",
];

#[derive(Default)]
struct FileTables {
    /// local name (alias or imported symbol) → dependency node id.
    aliases: HashMap<String, String>,
    /// module-level function name → node id.
    functions: HashMap<String, String>,
    /// class name → method name → node id.
    methods: HashMap<String, HashMap<String, String>>,
}

impl Extractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| ExtractError::Utf8(path.to_string()))?;
        let grammar: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let tree = parse_source(&grammar, path, content)?;
        let root = tree.root_node();

        let mut builder = GraphBuilder::new(path, Language::Python);
        builder.set_file_end(source.lines().count().max(1) as u32);
        builder.package(&module_path(path));

        let mut tables = FileTables::default();
        // (ast node, graph id, enclosing class) queued for the scanners.
        let mut scopes: Vec<(TsNode<'_>, String, Option<String>)> = Vec::new();

        for statement in named_children(root) {
            self.collect_statement(
                &mut builder,
                &mut tables,
                &mut scopes,
                statement,
                content,
                &[],
            );
        }

        // Mounts live at module level: app.include_router(...) calls and
        // `r = APIRouter(prefix=...)` assignments.
        http::collect_router_mounts(&mut builder, root, content);

        for (node, id, class) in &scopes {
            if let Some(body) = node.child_by_field_name("body") {
                http::scan_api_calls(&mut builder, id, body, content);
                self.scan_calls(&mut builder, &tables, id, class.as_deref(), body, content);
            }
        }

        Ok(builder.finish())
    }
}

impl PythonExtractor {
    fn collect_statement<'a>(
        &self,
        builder: &mut GraphBuilder,
        tables: &mut FileTables,
        scopes: &mut Vec<(TsNode<'a>, String, Option<String>)>,
        statement: TsNode<'a>,
        source: &[u8],
        decorators: &[TsNode<'a>],
    ) {
        match statement.kind() {
            "import_statement" | "import_from_statement" => {
                self.collect_import(builder, tables, statement, source);
            }
            "decorated_definition" => {
                let decs: Vec<TsNode<'a>> = named_children(statement)
                    .into_iter()
                    .filter(|n| n.kind() == "decorator")
                    .collect();
                if let Some(definition) = statement.child_by_field_name("definition") {
                    self.collect_statement(builder, tables, scopes, definition, source, &decs);
                }
            }
            "function_definition" => {
                let name = field_text(statement, "name", source);
                if name.is_empty() {
                    return;
                }
                let id = builder.declaration(
                    NodeType::Function,
                    &name,
                    line_start(statement),
                    line_end(statement),
                    !name.starts_with('_'),
                    &py_signature(statement, source),
                    &docstring(statement, source),
                );
                tables.functions.insert(name.clone(), id.clone());
                http::scan_route_decorators(builder, &id, &name, decorators, source);
                scopes.push((statement, id, None));
            }
            "class_definition" => {
                self.collect_class(builder, tables, scopes, statement, source);
            }
            "expression_statement" => {
                // Module-level bindings: UPPER_CASE names are constants.
                for expr in named_children(statement) {
                    if expr.kind() != "assignment" {
                        continue;
                    }
                    let Some(left) = expr.child_by_field_name("left") else {
                        continue;
                    };
                    if left.kind() != "identifier" {
                        continue;
                    }
                    let name = text(left, source).to_string();
                    let node_type = if name.chars().all(|c| !c.is_lowercase()) {
                        NodeType::Constant
                    } else {
                        NodeType::Variable
                    };
                    builder.declaration(
                        node_type,
                        &name,
                        line_start(statement),
                        line_end(statement),
                        !name.starts_with('_'),
                        text(statement, source).lines().next().unwrap_or("").trim(),
                        "",
                    );
                }
            }
            _ => {}
        }
    }

    fn collect_import(
        &self,
        builder: &mut GraphBuilder,
        tables: &mut FileTables,
        statement: TsNode<'_>,
        source: &[u8],
    ) {
        let line = line_start(statement);
        if statement.kind() == "import_statement" {
            for child in named_children(statement) {
                match child.kind() {
                    "dotted_name" => {
                        let raw = text(child, source).to_string();
                        let dep_id = builder.import_dep(&raw, line);
                        let root = raw.split('.').next().unwrap_or(&raw).to_string();
                        tables.aliases.insert(root, dep_id);
                    }
                    "aliased_import" => {
                        let raw = field_text(child, "name", source);
                        let alias = field_text(child, "alias", source);
                        if raw.is_empty() {
                            continue;
                        }
                        let dep_id = builder.import_dep(&raw, line);
                        if !alias.is_empty() {
                            tables.aliases.insert(alias, dep_id);
                        }
                    }
                    _ => {}
                }
            }
            return;
        }

        // from a.b import c, d as e
        let module = statement
            .child_by_field_name("module_name")
            .map(|m| text(m, source).to_string())
            .unwrap_or_default();
        if module.is_empty() {
            return;
        }
        let dep_id = builder.import_dep(&module, line);
        for child in named_children(statement) {
            match child.kind() {
                "dotted_name" if text(child, source) != module => {
                    tables
                        .aliases
                        .insert(text(child, source).to_string(), dep_id.clone());
                }
                "aliased_import" => {
                    let alias = field_text(child, "alias", source);
                    if !alias.is_empty() {
                        tables.aliases.insert(alias, dep_id.clone());
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_class<'a>(
        &self,
        builder: &mut GraphBuilder,
        tables: &mut FileTables,
        scopes: &mut Vec<(TsNode<'a>, String, Option<String>)>,
        class: TsNode<'a>,
        source: &[u8],
    ) {
        let name = field_text(class, "name", source);
        if name.is_empty() {
            return;
        }
        let bases: Vec<String> = class
            .child_by_field_name("superclasses")
            .map(|sc| {
                named_children(sc)
                    .into_iter()
                    .filter(|n| n.kind() == "identifier" || n.kind() == "attribute")
                    .map(|n| text(n, source).to_string())
                    .collect()
            })
            .unwrap_or_default();
        let is_protocol = bases
            .iter()
            .any(|b| b == "Protocol" || b.ends_with(".Protocol"));

        let node_type = if is_protocol {
            NodeType::Interface
        } else {
            NodeType::Class
        };
        let id = builder.declaration(
            node_type,
            &name,
            line_start(class),
            line_end(class),
            !name.starts_with('_'),
            &py_signature(class, source),
            &docstring(class, source),
        );

        let body = match class.child_by_field_name("body") {
            Some(body) => body,
            None => return,
        };

        let mut method_names = Vec::new();
        let mut field_names = Vec::new();
        for item in named_children(body) {
            let (definition, decorators) = if item.kind() == "decorated_definition" {
                let decs: Vec<TsNode<'a>> = named_children(item)
                    .into_iter()
                    .filter(|n| n.kind() == "decorator")
                    .collect();
                (item.child_by_field_name("definition"), decs)
            } else {
                (Some(item), Vec::new())
            };
            let Some(definition) = definition else { continue };
            match definition.kind() {
                "function_definition" => {
                    let method_name = field_text(definition, "name", source);
                    if method_name.is_empty() {
                        continue;
                    }
                    let method_id = builder.declaration(
                        NodeType::Method,
                        &method_name,
                        line_start(definition),
                        line_end(definition),
                        !method_name.starts_with('_'),
                        &py_signature(definition, source),
                        &docstring(definition, source),
                    );
                    builder.set_prop(&method_id, "receiver", &name);
                    http::scan_route_decorators(
                        builder,
                        &method_id,
                        &method_name,
                        &decorators,
                        source,
                    );
                    method_names.push(method_name.clone());
                    tables
                        .methods
                        .entry(name.clone())
                        .or_default()
                        .insert(method_name, method_id.clone());
                    scopes.push((definition, method_id, Some(name.clone())));
                }
                "expression_statement" => {
                    // Class-level fields: `x = ...` and `x: int = ...`.
                    for expr in named_children(definition) {
                        if expr.kind() == "assignment" {
                            if let Some(left) = expr.child_by_field_name("left") {
                                if left.kind() == "identifier" {
                                    field_names.push(text(left, source).to_string());
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        if is_protocol {
            builder.set_prop(&id, "protocol", "true");
            if !method_names.is_empty() {
                builder.set_prop(&id, "methods", &method_names.join(","));
            }
        } else {
            if !bases.is_empty() {
                builder.set_prop(&id, "bases", &bases.join(","));
            }
            if !field_names.is_empty() {
                builder.set_prop(&id, "fields", &field_names.join(","));
            }
        }
    }

    fn scan_calls<'a>(
        &self,
        builder: &mut GraphBuilder,
        tables: &FileTables,
        scope_id: &str,
        class: Option<&str>,
        body: TsNode<'a>,
        source: &[u8],
    ) {
        let mut calls = Vec::new();
        let mut gather = |node: TsNode<'a>| {
            if node.kind() == "call" {
                calls.push(node);
            }
        };
        visit(body, &mut gather);

        for call in calls {
            let Some(func) = call.child_by_field_name("function") else {
                continue;
            };
            match func.kind() {
                "identifier" => {
                    let name = text(func, source);
                    if PY_BUILTINS.contains(&name) {
                        continue;
                    }
                    if let Some(target) = tables.functions.get(name) {
                        if target != scope_id {
                            builder.calls(scope_id, target, None);
                        }
                    } else if let Some(dep_id) = tables.aliases.get(name) {
                        builder.calls(scope_id, dep_id, Some(name));
                    }
                }
                "attribute" => {
                    let object = field_text(func, "object", source);
                    let attribute = field_text(func, "attribute", source);
                    if object.is_empty() || attribute.is_empty() {
                        continue;
                    }
                    if object == "self" {
                        if let Some(target) = class
                            .and_then(|c| tables.methods.get(c))
                            .and_then(|m| m.get(&attribute))
                        {
                            if target != scope_id {
                                let class_name = class.unwrap_or_default();
                                builder.calls(
                                    scope_id,
                                    target,
                                    Some(&format!("{class_name}.{attribute}")),
                                );
                            }
                        }
                    } else if let Some(dep_id) = tables.aliases.get(&object) {
                        builder.calls(scope_id, dep_id, Some(&attribute));
                    }
                }
                _ => {}
            }
        }
    }
}

/// Dotted module path: `hypatia/routes/instances.py` →
/// `hypatia.routes.instances`.
fn module_path(path: &str) -> String {
    let trimmed = path
        .trim_end_matches(".py")
        .trim_end_matches(".pyi")
        .trim_end_matches("/__init__");
    trimmed.replace('/', ".")
}

fn py_signature(node: TsNode<'_>, source: &[u8]) -> String {
    signature_before_body(node, source)
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// Leading docstring of a function/class body, unquoted.
fn docstring(node: TsNode<'_>, source: &[u8]) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    let Some(first) = named_children(body).into_iter().next() else {
        return String::new();
    };
    if first.kind() != "expression_statement" {
        return String::new();
    }
    match named_children(first).first() {
        Some(expr) if expr.kind() == "string" => unquote(text(*expr, source)).trim().to_string(),
        _ => String::new(),
    }
}
