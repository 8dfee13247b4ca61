//! Rust extractor: use-imports, pub visibility, traits as interfaces,
//! impl-block methods with receivers, axum route registration, reqwest
//! client calls, and intra-file call edges.

use std::collections::HashMap;

use carta_core::{Edge, EdgeType, Language, NodeType};
use tree_sitter::Node as TsNode;

use crate::builder::GraphBuilder;
use crate::extractor::{ExtractError, Extractor, ParseResult};
use crate::strings::{unquote, url_path};
use crate::treesitter::{
    doc_comment_above, field_text, line_end, line_start, named_children, parse_source,
    signature_before_body, text, visit,
};

pub struct RustExtractor;

#[derive(Default)]
struct FileTables {
    /// first path segment of a use import → dependency node id.
    aliases: HashMap<String, String>,
    /// function name → node id.
    functions: HashMap<String, String>,
    /// impl type → method name → node id.
    methods: HashMap<String, HashMap<String, String>>,
    /// trait name → interface node id (same file).
    traits: HashMap<String, String>,
}

impl Extractor for RustExtractor {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| ExtractError::Utf8(path.to_string()))?;
        let grammar: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
        let tree = parse_source(&grammar, path, content)?;
        let root = tree.root_node();

        let mut builder = GraphBuilder::new(path, Language::Rust);
        builder.set_file_end(source.lines().count().max(1) as u32);
        builder.package(&module_path(path));

        let mut tables = FileTables::default();
        // (body, graph id, fn name, impl type) queued for the scanners.
        let mut scopes: Vec<(TsNode<'_>, String, String, Option<String>)> = Vec::new();

        for item in named_children(root) {
            collect_item(&mut builder, &mut tables, &mut scopes, item, content);
        }

        for (body, id, name, impl_type) in &scopes {
            scan_calls(
                &mut builder,
                &tables,
                id,
                name,
                impl_type.as_deref(),
                *body,
                content,
            );
        }

        Ok(builder.finish())
    }
}

fn collect_item<'a>(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    scopes: &mut Vec<(TsNode<'a>, String, String, Option<String>)>,
    item: TsNode<'a>,
    source: &[u8],
) {
    match item.kind() {
        "use_declaration" => {
            let raw = text(item, source)
                .trim_start_matches("pub ")
                .trim_start_matches("use ")
                .trim_end_matches(';')
                .trim()
                .to_string();
            if raw.is_empty() {
                return;
            }
            let dep_id = builder.import_dep(&raw, line_start(item));
            let root_segment = raw.split("::").next().unwrap_or(&raw).trim().to_string();
            if !root_segment.is_empty() && !root_segment.contains('{') {
                tables.aliases.insert(root_segment, dep_id);
            }
        }
        "function_item" => {
            let name = field_text(item, "name", source);
            if name.is_empty() {
                return;
            }
            let id = builder.declaration(
                NodeType::Function,
                &name,
                line_start(item),
                line_end(item),
                is_pub(item),
                &signature_before_body(item, source),
                &doc_comment_above(item, source, &["///", "//"]),
            );
            tables.functions.insert(name.clone(), id.clone());
            if let Some(body) = item.child_by_field_name("body") {
                scopes.push((body, id, name, None));
            }
        }
        "struct_item" => {
            let name = field_text(item, "name", source);
            if name.is_empty() {
                return;
            }
            let id = builder.declaration(
                NodeType::Struct,
                &name,
                line_start(item),
                line_end(item),
                is_pub(item),
                &format!("struct {name}"),
                &doc_comment_above(item, source, &["///", "//"]),
            );
            let mut fields = Vec::new();
            if let Some(body) = item.child_by_field_name("body") {
                for field in named_children(body) {
                    if field.kind() == "field_declaration" {
                        let field_name = field_text(field, "name", source);
                        if !field_name.is_empty() {
                            fields.push(field_name);
                        }
                    }
                }
            }
            if !fields.is_empty() {
                builder.set_prop(&id, "fields", &fields.join(","));
            }
        }
        "trait_item" => {
            let name = field_text(item, "name", source);
            if name.is_empty() {
                return;
            }
            let id = builder.declaration(
                NodeType::Interface,
                &name,
                line_start(item),
                line_end(item),
                is_pub(item),
                &format!("trait {name}"),
                &doc_comment_above(item, source, &["///", "//"]),
            );
            let mut methods = Vec::new();
            if let Some(body) = item.child_by_field_name("body") {
                for member in named_children(body) {
                    if member.kind() == "function_signature_item"
                        || member.kind() == "function_item"
                    {
                        let method_name = field_text(member, "name", source);
                        if !method_name.is_empty() {
                            methods.push(method_name);
                        }
                    }
                }
            }
            if !methods.is_empty() {
                builder.set_prop(&id, "methods", &methods.join(","));
            }
            tables.traits.insert(name, id);
        }
        "impl_item" => {
            collect_impl(builder, tables, scopes, item, source);
        }
        "enum_item" => {
            let name = field_text(item, "name", source);
            if !name.is_empty() {
                builder.declaration(
                    NodeType::Enum,
                    &name,
                    line_start(item),
                    line_end(item),
                    is_pub(item),
                    &format!("enum {name}"),
                    &doc_comment_above(item, source, &["///", "//"]),
                );
            }
        }
        "const_item" | "static_item" => {
            let name = field_text(item, "name", source);
            if !name.is_empty() {
                builder.declaration(
                    NodeType::Constant,
                    &name,
                    line_start(item),
                    line_end(item),
                    is_pub(item),
                    text(item, source).lines().next().unwrap_or("").trim(),
                    "",
                );
            }
        }
        "type_item" => {
            let name = field_text(item, "name", source);
            if !name.is_empty() {
                builder.declaration(
                    NodeType::Type,
                    &name,
                    line_start(item),
                    line_end(item),
                    is_pub(item),
                    text(item, source).trim_end_matches(';').trim(),
                    "",
                );
            }
        }
        _ => {}
    }
}

fn collect_impl<'a>(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    scopes: &mut Vec<(TsNode<'a>, String, String, Option<String>)>,
    item: TsNode<'a>,
    source: &[u8],
) {
    let type_name = field_text(item, "type", source);
    if type_name.is_empty() {
        return;
    }
    let type_name = type_name.split('<').next().unwrap_or(&type_name).to_string();
    let trait_name = field_text(item, "trait", source);

    let Some(body) = item.child_by_field_name("body") else {
        return;
    };
    for member in named_children(body) {
        if member.kind() != "function_item" {
            continue;
        }
        let method_name = field_text(member, "name", source);
        if method_name.is_empty() {
            continue;
        }
        let method_id = builder.declaration(
            NodeType::Method,
            &method_name,
            line_start(member),
            line_end(member),
            is_pub(member),
            &signature_before_body(member, source),
            &doc_comment_above(member, source, &["///", "//"]),
        );
        builder.set_prop(&method_id, "receiver", &type_name);
        tables
            .methods
            .entry(type_name.clone())
            .or_default()
            .insert(method_name.clone(), method_id.clone());
        if let Some(method_body) = member.child_by_field_name("body") {
            scopes.push((method_body, method_id, method_name, Some(type_name.clone())));
        }
    }

    // `impl Trait for Type` with the trait in the same file links here;
    // cross-file trait implementations are out of single-file reach.
    if !trait_name.is_empty() {
        let bare_trait = trait_name.split('<').next().unwrap_or(&trait_name).trim();
        if let Some(trait_id) = tables.traits.get(bare_trait) {
            let type_node_id =
                carta_core::id::node_id(NodeType::Struct, builder.file_path(), &type_name);
            if builder.contains_node(&type_node_id) {
                let edge = Edge::new(EdgeType::Implements, &type_node_id, trait_id)
                    .with_prop("kind", "nominal");
                builder.edge(edge);
            }
        }
    }
}

/// Module path from the file location: `svc/src/graph/mod.rs` →
/// `graph`, `svc/src/parser.rs` → `parser`.
fn module_path(path: &str) -> String {
    let trimmed = path.trim_end_matches(".rs");
    let segments: Vec<&str> = trimmed.split('/').collect();
    let after_src: Vec<&str> = match segments.iter().rposition(|s| *s == "src") {
        Some(idx) => segments[idx + 1..].to_vec(),
        None => segments[segments.len().saturating_sub(1)..].to_vec(),
    };
    let mut parts: Vec<&str> = after_src
        .into_iter()
        .filter(|s| !s.is_empty() && *s != "mod")
        .collect();
    if parts.last().is_some_and(|s| *s == "lib" || *s == "main") && parts.len() > 1 {
        parts.pop();
    }
    if parts.is_empty() {
        "crate".to_string()
    } else {
        parts.join("::")
    }
}

fn is_pub(item: TsNode<'_>) -> bool {
    named_children(item)
        .into_iter()
        .any(|c| c.kind() == "visibility_modifier")
}

fn scan_calls(
    builder: &mut GraphBuilder,
    tables: &FileTables,
    scope_id: &str,
    scope_name: &str,
    impl_type: Option<&str>,
    body: TsNode<'_>,
    source: &[u8],
) {
    let mut calls = Vec::new();
    let mut gather = |node: TsNode<'_>| {
        if node.kind() == "call_expression" {
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
                if name == scope_name {
                    continue;
                }
                if let Some(target) = tables.functions.get(name) {
                    if target != scope_id {
                        builder.calls(scope_id, target, None);
                    }
                }
            }
            "field_expression" => {
                let value = func.child_by_field_name("value");
                let field = field_text(func, "field", source);
                if field.is_empty() {
                    continue;
                }
                // axum: .route("/x", get(handler))
                if field == "route" {
                    if let Some((method, route_path, handler)) =
                        axum_route_parts(call, source)
                    {
                        builder.endpoint(
                            scope_id,
                            &method,
                            &route_path,
                            "axum",
                            &handler,
                            line_start(call),
                        );
                        continue;
                    }
                }
                // reqwest-style verb on a client handle
                if let Some(method) = http_verb(&field) {
                    if let Some(url) = first_string_arg(call, source) {
                        if url.starts_with("http://")
                            || url.starts_with("https://")
                            || value
                                .map(|v| text(v, source).to_lowercase().contains("client"))
                                .unwrap_or(false)
                        {
                            builder.api_call(
                                scope_id,
                                method,
                                &url_path(&url),
                                "reqwest",
                                line_start(call),
                            );
                            continue;
                        }
                    }
                }
                // self.method()
                if value.map(|v| v.kind()) == Some("self") {
                    if let Some(target) = impl_type
                        .and_then(|t| tables.methods.get(t))
                        .and_then(|m| m.get(&field))
                    {
                        if target != scope_id {
                            let impl_type = impl_type.unwrap_or_default();
                            builder.calls(
                                scope_id,
                                target,
                                Some(&format!("{impl_type}.{field}")),
                            );
                        }
                    }
                }
            }
            "scoped_identifier" => {
                let full = text(func, source);
                // reqwest::get("...")
                if let Some(rest) = full.strip_prefix("reqwest::") {
                    if let Some(method) = http_verb(rest) {
                        if let Some(url) = first_string_arg(call, source) {
                            builder.api_call(
                                scope_id,
                                method,
                                &url_path(&url),
                                "reqwest",
                                line_start(call),
                            );
                            continue;
                        }
                    }
                }
                let root = full.split("::").next().unwrap_or("");
                if let Some(dep_id) = tables.aliases.get(root) {
                    let callee = full.split("::").skip(1).collect::<Vec<_>>().join("::");
                    if !callee.is_empty() {
                        builder.calls(scope_id, dep_id, Some(&callee));
                    }
                }
            }
            _ => {}
        }
    }
}

/// `.route("/x", get(handler))` → (GET, /x, handler).
fn axum_route_parts(call: TsNode<'_>, source: &[u8]) -> Option<(String, String, String)> {
    let arguments = call.child_by_field_name("arguments")?;
    let args = named_children(arguments);
    let path_node = args.first()?;
    if path_node.kind() != "string_literal" {
        return None;
    }
    let route_path = unquote(text(*path_node, source));
    let method_call = args.get(1)?;
    if method_call.kind() != "call_expression" {
        return None;
    }
    let method_fn = method_call.child_by_field_name("function")?;
    let verb = http_verb(text(method_fn, source))?;
    let handler = method_call
        .child_by_field_name("arguments")
        .and_then(|a| named_children(a).into_iter().next())
        .map(|h| text(h, source).to_string())
        .unwrap_or_default();
    Some((verb.to_string(), route_path, handler))
}

fn http_verb(name: &str) -> Option<&'static str> {
    match name {
        "get" => Some("GET"),
        "post" => Some("POST"),
        "put" => Some("PUT"),
        "patch" => Some("PATCH"),
        "delete" => Some("DELETE"),
        "head" => Some("HEAD"),
        _ => None,
    }
}

fn first_string_arg(call: TsNode<'_>, source: &[u8]) -> Option<String> {
    let arguments = call.child_by_field_name("arguments")?;
    named_children(arguments)
        .into_iter()
        .next()
        .filter(|a| a.kind() == "string_literal" || a.kind() == "raw_string_literal")
        .map(|a| unquote(text(a, source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extractor;

    fn parse(path: &str, source: &str) -> ParseResult {
        RustExtractor.parse_file(path, source.as_bytes()).unwrap()
    }

    fn find<'a>(
        result: &'a ParseResult,
        node_type: NodeType,
        name: &str,
    ) -> &'a carta_core::Node {
        result
            .nodes
            .iter()
            .find(|n| n.node_type == node_type && n.name == name)
            .unwrap_or_else(|| panic!("no {node_type:?} named {name}"))
    }

    #[test]
    fn test_module_and_visibility() {
        let result = parse(
            "svc/src/parser.rs",
            r#"use std::collections::HashMap;

/// Parses things.
pub fn parse(input: &str) -> usize {
    helper(input.len())
}

fn helper(n: usize) -> usize { n }
"#,
        );
        find(&result, NodeType::Package, "parser");
        let dep = find(&result, NodeType::Dependency, "std::collections::HashMap");
        assert_eq!(dep.prop("kind"), "import");
        let parse_fn = find(&result, NodeType::Function, "parse");
        assert!(parse_fn.exported);
        assert_eq!(parse_fn.doc_comment, "Parses things.");
        let helper = find(&result, NodeType::Function, "helper");
        assert!(!helper.exported);

        assert!(result.edges.iter().any(|e| {
            e.edge_type == EdgeType::Calls
                && e.source_id == parse_fn.id
                && e.target_id == helper.id
        }));
    }

    #[test]
    fn test_trait_struct_and_impl() {
        let result = parse(
            "svc/src/store.rs",
            r#"pub trait Store {
    fn add(&mut self, key: String);
    fn get(&self, key: &str) -> Option<String>;
}

pub struct MemStore {
    items: Vec<String>,
    count: usize,
}

impl Store for MemStore {
    fn add(&mut self, key: String) {}
    fn get(&self, key: &str) -> Option<String> { None }
}
"#,
        );
        let trait_node = find(&result, NodeType::Interface, "Store");
        assert_eq!(trait_node.prop("methods"), "add,get");
        let struct_node = find(&result, NodeType::Struct, "MemStore");
        assert_eq!(struct_node.prop("fields"), "items,count");
        let add = find(&result, NodeType::Method, "add");
        assert_eq!(add.prop("receiver"), "MemStore");

        let implements = result
            .edges
            .iter()
            .find(|e| e.edge_type == EdgeType::Implements)
            .unwrap();
        assert_eq!(implements.source_id, struct_node.id);
        assert_eq!(implements.target_id, trait_node.id);
        assert_eq!(implements.properties["kind"], "nominal");
    }

    #[test]
    fn test_axum_route() {
        let result = parse(
            "svc/src/server.rs",
            r#"pub fn router() -> Router {
    Router::new().route("/health", get(health_check))
}
"#,
        );
        let ep = find(&result, NodeType::ApiEndpoint, "GET /health");
        assert_eq!(ep.prop("framework"), "axum");
        assert_eq!(ep.prop("handler"), "health_check");
    }

    #[test]
    fn test_reqwest_client_call() {
        let result = parse(
            "svc/src/client.rs",
            r#"pub async fn fetch_users(client: &reqwest::Client) {
    client.get("http://users/api/v1/users").send().await;
}
"#,
        );
        let call = find(&result, NodeType::Dependency, "GET /api/v1/users");
        assert_eq!(call.prop("kind"), "api_call");
        assert_eq!(call.prop("framework"), "reqwest");
    }

    #[test]
    fn test_integration_test_file() {
        let result = parse(
            "svc/tests/parsing.rs",
            r#"fn test_roundtrip() {}

fn setup() {}
"#,
        );
        find(&result, NodeType::TestFile, "parsing.rs");
        find(&result, NodeType::TestFunction, "test_roundtrip");
        find(&result, NodeType::Function, "setup");
    }

    #[test]
    fn test_self_method_call() {
        let result = parse(
            "svc/src/engine.rs",
            r#"pub struct Engine;

impl Engine {
    pub fn run(&self) {
        self.step();
    }

    fn step(&self) {}
}
"#,
        );
        let run = find(&result, NodeType::Method, "run");
        let step = find(&result, NodeType::Method, "step");
        let edge = result
            .edges
            .iter()
            .find(|e| {
                e.edge_type == EdgeType::Calls
                    && e.source_id == run.id
                    && e.target_id == step.id
            })
            .unwrap();
        assert_eq!(edge.properties["callee"], "Engine.step");
    }
}
