//! C# extractor: namespaces, using-imports, base lists, ASP.NET
//! attribute routes with `[controller]` substitution, HttpClient calls,
//! and intra-file call edges.

use std::collections::HashMap;

use carta_core::{Language, NodeType};
use tree_sitter::Node as TsNode;

use crate::builder::GraphBuilder;
use crate::extractor::{ExtractError, Extractor, ParseResult};
use crate::strings::{lower_first, unquote, url_path};
use crate::treesitter::{
    field_text, line_end, line_start, named_children, parse_source, signature_before_body, text,
    visit,
};

pub struct CSharpExtractor;

const VERB_ATTRIBUTES: [(&str, &str); 5] = [
    ("HttpGet", "GET"),
    ("HttpPost", "POST"),
    ("HttpPut", "PUT"),
    ("HttpDelete", "DELETE"),
    ("HttpPatch", "PATCH"),
];

#[derive(Default)]
struct FileTables {
    /// class name → method name → node id.
    methods: HashMap<String, HashMap<String, String>>,
    /// class name → field name → field type.
    fields: HashMap<String, HashMap<String, String>>,
}

impl Extractor for CSharpExtractor {
    fn language(&self) -> Language {
        Language::CSharp
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| ExtractError::Utf8(path.to_string()))?;
        let grammar: tree_sitter::Language = tree_sitter_c_sharp::LANGUAGE.into();
        let tree = parse_source(&grammar, path, content)?;
        let root = tree.root_node();

        let mut builder = GraphBuilder::new(path, Language::CSharp);
        builder.set_file_end(source.lines().count().max(1) as u32);

        // Usings precede the namespace in source order; bind the package
        // first so imports attach beneath it.
        if let Some(namespace) = declared_namespace(root, content) {
            builder.package(&namespace);
        }

        let mut tables = FileTables::default();
        let mut scopes: Vec<(TsNode<'_>, String, String)> = Vec::new();

        collect_container(&mut builder, &mut tables, &mut scopes, root, content);

        for (body, id, class) in &scopes {
            scan_calls(&mut builder, &tables, id, class, *body, source.as_bytes());
        }

        Ok(builder.finish())
    }
}

fn declared_namespace(root: TsNode<'_>, source: &[u8]) -> Option<String> {
    let mut found = None;
    let mut gather = |node: TsNode<'_>| {
        if found.is_none()
            && (node.kind() == "namespace_declaration"
                || node.kind() == "file_scoped_namespace_declaration")
        {
            let name = field_text(node, "name", source);
            if !name.is_empty() {
                found = Some(name);
            }
        }
    };
    visit(root, &mut gather);
    found
}

/// Walks a compilation unit or namespace body, collecting usings,
/// namespaces, classes, and interfaces.
fn collect_container<'a>(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    scopes: &mut Vec<(TsNode<'a>, String, String)>,
    container: TsNode<'a>,
    source: &[u8],
) {
    for child in named_children(container) {
        match child.kind() {
            "using_directive" => {
                if let Some(name) = named_children(child)
                    .into_iter()
                    .find(|n| n.kind() == "qualified_name" || n.kind() == "identifier")
                {
                    builder.import_dep(text(name, source), line_start(child));
                }
            }
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                let name = field_text(child, "name", source);
                if !name.is_empty() {
                    builder.package(&name);
                }
                // Members are children of the namespace (or its body).
                let body = child.child_by_field_name("body").unwrap_or(child);
                collect_container(builder, tables, scopes, body, source);
            }
            "class_declaration" => {
                collect_class(builder, tables, scopes, child, source);
            }
            "interface_declaration" => {
                collect_interface(builder, child, source);
            }
            "enum_declaration" => {
                let name = field_text(child, "name", source);
                if !name.is_empty() {
                    builder.declaration(
                        NodeType::Enum,
                        &name,
                        line_start(child),
                        line_end(child),
                        is_public(child, source),
                        &format!("enum {name}"),
                        "",
                    );
                }
            }
            _ => {}
        }
    }
}

fn collect_class<'a>(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    scopes: &mut Vec<(TsNode<'a>, String, String)>,
    class: TsNode<'a>,
    source: &[u8],
) {
    let name = field_text(class, "name", source);
    if name.is_empty() {
        return;
    }
    let id = builder.declaration(
        NodeType::Class,
        &name,
        line_start(class),
        line_end(class),
        is_public(class, source),
        &format!("class {name}"),
        "",
    );

    // `: Base, IStore` mixes the base class and
    // interfaces; the nominal-implements phase filters by interface name.
    let bases: Vec<String> = class
        .child_by_field_name("bases")
        .map(|base_list| {
            named_children(base_list)
                .into_iter()
                .filter(|n| n.kind() == "identifier" || n.kind() == "qualified_name" || n.kind() == "generic_name")
                .map(|n| {
                    let t = text(n, source);
                    t.split('<').next().unwrap_or(t).trim().to_string()
                })
                .collect()
        })
        .unwrap_or_default();
    if !bases.is_empty() {
        builder.set_prop(&id, "implements", &bases.join(","));
    }

    let base_route = attribute_value(class, "Route", source).unwrap_or_default();
    let base_route = substitute_controller(&base_route, &name);

    let Some(body) = class.child_by_field_name("body") else {
        return;
    };
    let mut field_names = Vec::new();
    for member in named_children(body) {
        match member.kind() {
            "field_declaration" => {
                for declaration in named_children(member) {
                    if declaration.kind() != "variable_declaration" {
                        continue;
                    }
                    let field_type = field_text(declaration, "type", source);
                    for declarator in named_children(declaration) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let field_name = field_text(declarator, "name", source);
                        if field_name.is_empty() {
                            continue;
                        }
                        field_names.push(field_name.clone());
                        tables
                            .fields
                            .entry(name.clone())
                            .or_default()
                            .insert(field_name, field_type.clone());
                    }
                }
            }
            "property_declaration" => {
                let prop_name = field_text(member, "name", source);
                if !prop_name.is_empty() {
                    field_names.push(prop_name);
                }
            }
            "method_declaration" => {
                let method_name = field_text(member, "name", source);
                if method_name.is_empty() {
                    continue;
                }
                let method_id = builder.declaration(
                    NodeType::Method,
                    &method_name,
                    line_start(member),
                    line_end(member),
                    is_public(member, source),
                    &signature_before_body(member, source),
                    "",
                );
                builder.set_prop(&method_id, "receiver", &name);
                tables
                    .methods
                    .entry(name.clone())
                    .or_default()
                    .insert(method_name.clone(), method_id.clone());

                emit_route(builder, &method_id, &method_name, &base_route, member, source);

                if let Some(method_body) = member.child_by_field_name("body") {
                    scopes.push((method_body, method_id, name.clone()));
                }
            }
            _ => {}
        }
    }
    if !field_names.is_empty() {
        builder.set_prop(&id, "fields", &field_names.join(","));
    }
}

fn collect_interface(builder: &mut GraphBuilder, interface: TsNode<'_>, source: &[u8]) {
    let name = field_text(interface, "name", source);
    if name.is_empty() {
        return;
    }
    let id = builder.declaration(
        NodeType::Interface,
        &name,
        line_start(interface),
        line_end(interface),
        is_public(interface, source),
        &format!("interface {name}"),
        "",
    );
    let mut methods = Vec::new();
    if let Some(body) = interface.child_by_field_name("body") {
        for member in named_children(body) {
            if member.kind() == "method_declaration" {
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
}

fn emit_route(
    builder: &mut GraphBuilder,
    method_id: &str,
    method_name: &str,
    base_route: &str,
    method: TsNode<'_>,
    source: &[u8],
) {
    for (attribute, verb) in VERB_ATTRIBUTES {
        let Some(template) = attribute_lookup(method, attribute, source) else {
            continue;
        };
        let mut path = base_route.to_string();
        if let Some(template) = template {
            if !template.is_empty() {
                path = format!(
                    "{}/{}",
                    path.trim_end_matches('/'),
                    template.trim_start_matches('/')
                );
            }
        }
        if path.is_empty() {
            continue;
        }
        if !path.starts_with('/') {
            path = format!("/{path}");
        }
        builder.endpoint(method_id, verb, &path, "aspnet", method_name, line_start(method));
    }
}

/// Whether the node carries `[name]` or `[name("...")]`; inner Option is
/// the attribute's first string argument.
fn attribute_lookup(
    node: TsNode<'_>,
    attribute_name: &str,
    source: &[u8],
) -> Option<Option<String>> {
    let mut found = None;
    let mut gather = |candidate: TsNode<'_>| {
        if candidate.kind() != "attribute" || found.is_some() {
            return;
        }
        if field_text(candidate, "name", source) != attribute_name {
            return;
        }
        let mut value = None;
        let mut inner = |n: TsNode<'_>| {
            if value.is_none() && n.kind() == "string_literal" {
                value = Some(unquote(text(n, source)));
            }
        };
        visit(candidate, &mut inner);
        found = Some(value);
    };
    // Attribute lists precede the declaration inside the same node.
    for child in named_children(node) {
        if child.kind() == "attribute_list" {
            visit(child, &mut gather);
        }
    }
    found
}

fn attribute_value(node: TsNode<'_>, attribute_name: &str, source: &[u8]) -> Option<String> {
    attribute_lookup(node, attribute_name, source).flatten()
}

/// `api/[controller]` with class `UsersController` → `api/users`.
fn substitute_controller(route: &str, class_name: &str) -> String {
    let controller = class_name.trim_end_matches("Controller");
    route.replace("[controller]", &lower_first(controller).to_lowercase())
}

fn is_public(node: TsNode<'_>, source: &[u8]) -> bool {
    named_children(node)
        .into_iter()
        .filter(|n| n.kind() == "modifier")
        .any(|n| text(n, source) == "public")
}

fn scan_calls<'a>(
    builder: &mut GraphBuilder,
    tables: &FileTables,
    scope_id: &str,
    class: &str,
    body: TsNode<'a>,
    source: &[u8],
) {
    let mut invocations = Vec::new();
    let mut gather = |node: TsNode<'a>| {
        if node.kind() == "invocation_expression" {
            invocations.push(node);
        }
    };
    visit(body, &mut gather);

    for invocation in invocations {
        let Some(function) = invocation.child_by_field_name("function") else {
            continue;
        };
        match function.kind() {
            "identifier" => {
                let name = text(function, source);
                if let Some(target) = tables.methods.get(class).and_then(|m| m.get(name)) {
                    if target != scope_id {
                        builder.calls(scope_id, target, Some(&format!("{class}.{name}")));
                    }
                }
            }
            "member_access_expression" => {
                let member = field_text(function, "name", source);
                if member.is_empty() {
                    continue;
                }

                // HttpClient verbs.
                if let Some(method) = http_client_verb(&member) {
                    let url = invocation
                        .child_by_field_name("arguments")
                        .and_then(|args| named_children(args).into_iter().next())
                        .and_then(|arg| named_children(arg).into_iter().next())
                        .filter(|n| n.kind() == "string_literal")
                        .map(|n| unquote(text(n, source)));
                    if let Some(url) = url {
                        builder.api_call(
                            scope_id,
                            method,
                            &url_path(&url),
                            "httpclient",
                            line_start(invocation),
                        );
                        continue;
                    }
                    if member == "SendAsync" {
                        builder.api_call(
                            scope_id,
                            "UNKNOWN",
                            "UNKNOWN",
                            "httpclient",
                            line_start(invocation),
                        );
                        continue;
                    }
                }

                let Some(expression) = function.child_by_field_name("expression") else {
                    continue;
                };
                let receiver_class = match expression.kind() {
                    "this_expression" => Some(class.to_string()),
                    "identifier" => tables
                        .fields
                        .get(class)
                        .and_then(|fields| fields.get(text(expression, source)))
                        .cloned(),
                    _ => None,
                };
                if let Some(receiver_class) = receiver_class {
                    if let Some(target) = tables
                        .methods
                        .get(&receiver_class)
                        .and_then(|m| m.get(&member))
                    {
                        if target != scope_id {
                            builder.calls(
                                scope_id,
                                target,
                                Some(&format!("{receiver_class}.{member}")),
                            );
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn http_client_verb(member: &str) -> Option<&'static str> {
    match member {
        "GetAsync" | "GetStringAsync" => Some("GET"),
        "PostAsync" => Some("POST"),
        "PutAsync" => Some("PUT"),
        "DeleteAsync" => Some("DELETE"),
        "SendAsync" => Some("UNKNOWN"),
        _ => None,
    }
}
