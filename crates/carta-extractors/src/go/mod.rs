//! Go extractor: declarations, receiver methods, struct field tables,
//! HTTP route/client-call recognition, and intra-file call edges.

mod calls;
mod http;

use std::collections::{HashMap, HashSet};

use carta_core::{Language, NodeType};
use tree_sitter::Node as TsNode;

use crate::builder::GraphBuilder;
use crate::extractor::{ExtractError, Extractor, ParseResult};
use crate::strings::unquote;
use crate::treesitter::{
    doc_comment_above, field_text, line_end, line_start, named_children, parse_source,
    signature_before_body, text,
};

pub struct GoExtractor;

/// Per-file lookup tables shared by the route and call scanners.
#[derive(Default)]
struct FileTables {
    /// import alias → dependency node id (explicit rename, else final
    /// path segment).
    aliases: HashMap<String, String>,
    /// import alias → raw import path.
    alias_paths: HashMap<String, String>,
    /// raw import paths, for framework detection.
    import_paths: HashSet<String>,
    /// function name → node id (this file only).
    functions: HashMap<String, String>,
    /// receiver type → method name → node id.
    methods: HashMap<String, HashMap<String, String>>,
    /// struct name → field name → field type text.
    struct_fields: HashMap<String, HashMap<String, String>>,
    /// same-file string constants, for URL-argument resolution.
    consts: HashMap<String, String>,
}

/// A function or method body queued for the route/call scanners.
struct FnScope<'a> {
    node: TsNode<'a>,
    id: String,
    name: String,
    receiver_var: Option<String>,
    receiver_type: Option<String>,
}

impl Extractor for GoExtractor {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| ExtractError::Utf8(path.to_string()))?;
        let grammar: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
        let tree = parse_source(&grammar, path, content)?;
        let root = tree.root_node();

        let mut builder = GraphBuilder::new(path, Language::Go);
        builder.set_file_end(source.lines().count().max(1) as u32);

        let mut tables = FileTables::default();
        let mut scopes: Vec<FnScope> = Vec::new();

        for child in named_children(root) {
            match child.kind() {
                "package_clause" => {
                    let name = named_children(child)
                        .first()
                        .map(|n| text(*n, content).to_string())
                        .unwrap_or_default();
                    if !name.is_empty() {
                        builder.package(&name);
                    }
                }
                "import_declaration" => {
                    self.collect_imports(&mut builder, &mut tables, child, content);
                }
                "function_declaration" => {
                    let name = field_text(child, "name", content);
                    if name.is_empty() {
                        continue;
                    }
                    let id = builder.declaration(
                        NodeType::Function,
                        &name,
                        line_start(child),
                        line_end(child),
                        is_exported(&name),
                        &signature_before_body(child, content),
                        &doc_comment_above(child, content, &["//"]),
                    );
                    tables.functions.insert(name.clone(), id.clone());
                    scopes.push(FnScope {
                        node: child,
                        id,
                        name,
                        receiver_var: None,
                        receiver_type: None,
                    });
                }
                "method_declaration" => {
                    let name = field_text(child, "name", content);
                    if name.is_empty() {
                        continue;
                    }
                    let receiver_text = field_text(child, "receiver", content);
                    let (recv_var, recv_type) = parse_receiver(&receiver_text);
                    let id = builder.declaration(
                        NodeType::Method,
                        &name,
                        line_start(child),
                        line_end(child),
                        is_exported(&name),
                        &signature_before_body(child, content),
                        &doc_comment_above(child, content, &["//"]),
                    );
                    if !recv_type.is_empty() {
                        builder.set_prop(&id, "receiver", &recv_type);
                        tables
                            .methods
                            .entry(recv_type.clone())
                            .or_default()
                            .insert(name.clone(), id.clone());
                    }
                    scopes.push(FnScope {
                        node: child,
                        id,
                        name,
                        receiver_var: if recv_var.is_empty() { None } else { Some(recv_var) },
                        receiver_type: if recv_type.is_empty() { None } else { Some(recv_type) },
                    });
                }
                "type_declaration" => {
                    self.collect_types(&mut builder, &mut tables, child, content);
                }
                "const_declaration" => {
                    self.collect_values(
                        &mut builder,
                        &mut tables,
                        child,
                        content,
                        NodeType::Constant,
                    );
                }
                "var_declaration" => {
                    self.collect_values(
                        &mut builder,
                        &mut tables,
                        child,
                        content,
                        NodeType::Variable,
                    );
                }
                _ => {}
            }
        }

        let framework = http::detect_framework(&tables.import_paths);
        for scope in &scopes {
            if let Some(body) = scope.node.child_by_field_name("body") {
                http::scan(&mut builder, scope, &tables, content, body, framework);
                calls::scan(&mut builder, scope, &tables, content, body);
            }
        }

        Ok(builder.finish())
    }
}

impl GoExtractor {
    fn collect_imports<'a>(
        &self,
        builder: &mut GraphBuilder,
        tables: &mut FileTables,
        decl: TsNode<'a>,
        source: &[u8],
    ) {
        let mut specs = Vec::new();
        let mut gather = |node: TsNode<'a>| {
            if node.kind() == "import_spec" {
                specs.push(node);
            }
        };
        crate::treesitter::visit(decl, &mut gather);

        for spec in specs {
            let raw = unquote(&field_text(spec, "path", source));
            if raw.is_empty() {
                continue;
            }
            let dep_id = builder.import_dep(&raw, line_start(spec));
            tables.import_paths.insert(raw.clone());

            let alias = match spec.child_by_field_name("name") {
                Some(name) => text(name, source).to_string(),
                None => raw.rsplit('/').next().unwrap_or(&raw).to_string(),
            };
            // Blank and dot imports have no usable alias.
            if alias != "_" && alias != "." && !alias.is_empty() {
                tables.aliases.insert(alias.clone(), dep_id);
                tables.alias_paths.insert(alias, raw);
            }
        }
    }

    fn collect_types(
        &self,
        builder: &mut GraphBuilder,
        tables: &mut FileTables,
        decl: TsNode<'_>,
        source: &[u8],
    ) {
        for spec in named_children(decl) {
            if spec.kind() != "type_spec" && spec.kind() != "type_alias" {
                continue;
            }
            let name = field_text(spec, "name", source);
            if name.is_empty() {
                continue;
            }
            let doc = doc_comment_above(decl, source, &["//"]);
            let signature = text(spec, source)
                .lines()
                .next()
                .unwrap_or("")
                .trim_end_matches('{')
                .trim()
                .to_string();
            let ty = spec.child_by_field_name("type");
            match ty.map(|t| t.kind()) {
                Some("struct_type") => {
                    let id = builder.declaration(
                        NodeType::Struct,
                        &name,
                        line_start(spec),
                        line_end(spec),
                        is_exported(&name),
                        &signature,
                        &doc,
                    );
                    let (fields, embeds) =
                        collect_struct_fields(ty.unwrap_or(spec), source);
                    if !fields.is_empty() {
                        let names: Vec<&str> =
                            fields.iter().map(|(n, _)| n.as_str()).collect();
                        builder.set_prop(&id, "fields", &names.join(","));
                        tables
                            .struct_fields
                            .insert(name.clone(), fields.into_iter().collect());
                    }
                    if !embeds.is_empty() {
                        builder.set_prop(&id, "embeds", &embeds.join(","));
                    }
                }
                Some("interface_type") => {
                    let id = builder.declaration(
                        NodeType::Interface,
                        &name,
                        line_start(spec),
                        line_end(spec),
                        is_exported(&name),
                        &signature,
                        &doc,
                    );
                    let methods = collect_interface_methods(ty.unwrap_or(spec), source);
                    if !methods.is_empty() {
                        builder.set_prop(&id, "methods", &methods.join(","));
                    }
                }
                _ => {
                    builder.declaration(
                        NodeType::Type,
                        &name,
                        line_start(spec),
                        line_end(spec),
                        is_exported(&name),
                        &signature,
                        &doc,
                    );
                }
            }
        }
    }

    fn collect_values<'a>(
        &self,
        builder: &mut GraphBuilder,
        tables: &mut FileTables,
        decl: TsNode<'a>,
        source: &[u8],
        node_type: NodeType,
    ) {
        let mut specs = Vec::new();
        let mut gather = |node: TsNode<'a>| {
            if node.kind() == "const_spec" || node.kind() == "var_spec" {
                specs.push(node);
            }
        };
        crate::treesitter::visit(decl, &mut gather);

        for spec in specs {
            let mut cursor = spec.walk();
            let names: Vec<String> = spec
                .children_by_field_name("name", &mut cursor)
                .map(|n| text(n, source).to_string())
                .collect();
            let value_node = spec.child_by_field_name("value");
            for name in names {
                if name.is_empty() || name == "_" {
                    continue;
                }
                builder.declaration(
                    node_type,
                    &name,
                    line_start(spec),
                    line_end(spec),
                    is_exported(&name),
                    text(spec, source).lines().next().unwrap_or("").trim(),
                    "",
                );
                if node_type == NodeType::Constant {
                    if let Some(value) = value_node {
                        for literal in named_children(value) {
                            if literal.kind() == "interpreted_string_literal"
                                || literal.kind() == "raw_string_literal"
                            {
                                tables
                                    .consts
                                    .insert(name.clone(), unquote(text(literal, source)));
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Parse `(s *Server)` receiver text into (var, type).
fn parse_receiver(receiver_text: &str) -> (String, String) {
    let trimmed = receiver_text.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);
    let parts: Vec<&str> = inner.split_whitespace().collect();
    match parts.as_slice() {
        [var, ty] => ((*var).to_string(), ty.trim_start_matches('*').to_string()),
        // Unnamed receiver: `(*Server)` or `(Server)`.
        [ty] => (String::new(), ty.trim_start_matches('*').to_string()),
        _ => (String::new(), String::new()),
    }
}

/// Returns (named fields with types, embedded type names) from a
/// struct_type node.
fn collect_struct_fields<'a>(
    struct_type: TsNode<'a>,
    source: &[u8],
) -> (Vec<(String, String)>, Vec<String>) {
    let mut fields = Vec::new();
    let mut embeds = Vec::new();
    let mut decls = Vec::new();
    let mut gather = |node: TsNode<'a>| {
        if node.kind() == "field_declaration" {
            decls.push(node);
        }
    };
    crate::treesitter::visit(struct_type, &mut gather);

    for decl in decls {
        let mut cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut cursor)
            .map(|n| text(n, source).to_string())
            .collect();
        let type_text = field_text(decl, "type", source);
        if names.is_empty() {
            // Embedded field: the bare (possibly qualified) type name.
            let embedded = type_text.trim_start_matches('*');
            if !embedded.is_empty() {
                embeds.push(embedded.to_string());
            }
        } else {
            for name in names {
                fields.push((name, type_text.clone()));
            }
        }
    }
    (fields, embeds)
}

fn collect_interface_methods(interface_type: TsNode<'_>, source: &[u8]) -> Vec<String> {
    let mut methods = Vec::new();
    let mut gather = |node: TsNode<'_>| {
        // Grammar renamed method_spec to method_elem in newer versions.
        if node.kind() == "method_elem" || node.kind() == "method_spec" {
            let name = field_text(node, "name", source);
            if !name.is_empty() {
                methods.push(name);
            }
        }
    };
    crate::treesitter::visit(interface_type, &mut gather);
    methods
}
