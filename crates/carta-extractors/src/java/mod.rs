//! Java extractor: packages, imports, classes with implements lists,
//! Spring annotation routes (class-level path + method-level verb), and
//! intra-file call edges.

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

pub struct JavaExtractor;

const VERB_ANNOTATIONS: [(&str, &str); 5] = [
    ("GetMapping", "GET"),
    ("PostMapping", "POST"),
    ("PutMapping", "PUT"),
    ("DeleteMapping", "DELETE"),
    ("PatchMapping", "PATCH"),
];

#[derive(Default)]
struct FileTables {
    /// imported simple name → dependency node id.
    aliases: HashMap<String, String>,
    /// class name → method name → node id.
    methods: HashMap<String, HashMap<String, String>>,
    /// class name → field name → field type.
    fields: HashMap<String, HashMap<String, String>>,
}

impl Extractor for JavaExtractor {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| ExtractError::Utf8(path.to_string()))?;
        let grammar: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        let tree = parse_source(&grammar, path, content)?;
        let root = tree.root_node();

        let mut builder = GraphBuilder::new(path, Language::Java);
        builder.set_file_end(source.lines().count().max(1) as u32);

        let mut tables = FileTables::default();
        // (method body, graph id, class name) queued for the call scanner.
        let mut scopes: Vec<(TsNode<'_>, String, String)> = Vec::new();

        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    if let Some(name) = named_children(child)
                        .into_iter()
                        .find(|n| n.kind() == "scoped_identifier" || n.kind() == "identifier")
                    {
                        builder.package(text(name, source.as_bytes()));
                    }
                }
                "import_declaration" => {
                    if let Some(name) = named_children(child)
                        .into_iter()
                        .find(|n| n.kind() == "scoped_identifier" || n.kind() == "identifier")
                    {
                        let raw = text(name, source.as_bytes()).to_string();
                        let dep_id = builder.import_dep(&raw, line_start(child));
                        let simple = raw.rsplit('.').next().unwrap_or(&raw).to_string();
                        tables.aliases.insert(simple, dep_id);
                    }
                }
                "class_declaration" => {
                    collect_class(&mut builder, &mut tables, &mut scopes, child, source.as_bytes());
                }
                "interface_declaration" => {
                    collect_interface(&mut builder, child, source.as_bytes());
                }
                "enum_declaration" => {
                    let name = field_text(child, "name", source.as_bytes());
                    if !name.is_empty() {
                        builder.declaration(
                            NodeType::Enum,
                            &name,
                            line_start(child),
                            line_end(child),
                            is_public(child, source.as_bytes()),
                            &format!("enum {name}"),
                            &java_doc(child, source.as_bytes()),
                        );
                    }
                }
                _ => {}
            }
        }

        for (body, id, class) in &scopes {
            scan_calls(&mut builder, &tables, id, class, *body, source.as_bytes());
        }

        Ok(builder.finish())
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
        &java_doc(class, source),
    );

    let implements: Vec<String> = class
        .child_by_field_name("interfaces")
        .map(|interfaces| {
            let mut names = Vec::new();
            let mut gather = |node: TsNode<'_>| {
                if node.kind() == "type_identifier" {
                    names.push(text(node, source).to_string());
                }
            };
            visit(interfaces, &mut gather);
            names
        })
        .unwrap_or_default();
    if !implements.is_empty() {
        builder.set_prop(&id, "implements", &implements.join(","));
    }
    if let Some(superclass) = class.child_by_field_name("superclass") {
        let mut bases = Vec::new();
        let mut gather = |node: TsNode<'_>| {
            if node.kind() == "type_identifier" {
                bases.push(text(node, source).to_string());
            }
        };
        visit(superclass, &mut gather);
        if !bases.is_empty() {
            builder.set_prop(&id, "bases", &bases.join(","));
        }
    }

    // Class-level route base path from @RequestMapping.
    let class_annotations = annotations_of(class, source);
    let base_path = class_annotations
        .iter()
        .find(|(n, _)| n == "RequestMapping")
        .and_then(|(_, v)| v.clone())
        .unwrap_or_default();

    let Some(body) = class.child_by_field_name("body") else {
        return;
    };
    let mut field_names = Vec::new();
    for member in named_children(body) {
        match member.kind() {
            "field_declaration" => {
                let field_type = field_text(member, "type", source);
                for declarator in named_children(member) {
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
                    &java_doc(member, source),
                );
                builder.set_prop(&method_id, "receiver", &name);
                tables
                    .methods
                    .entry(name.clone())
                    .or_default()
                    .insert(method_name.clone(), method_id.clone());

                emit_route(builder, &method_id, &method_name, &base_path, member, source);

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
        &java_doc(interface, source),
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

/// Emit an endpoint when the method carries a Spring verb annotation
/// (or @RequestMapping with an explicit method).
fn emit_route(
    builder: &mut GraphBuilder,
    method_id: &str,
    method_name: &str,
    base_path: &str,
    method: TsNode<'_>,
    source: &[u8],
) {
    let annotations = annotations_of(method, source);
    for (annotation_name, value) in &annotations {
        let verb = VERB_ANNOTATIONS
            .iter()
            .find(|(n, _)| *n == annotation_name.as_str())
            .map(|(_, v)| (*v).to_string())
            .or_else(|| {
                if annotation_name == "RequestMapping" {
                    Some(request_mapping_method(method, source).unwrap_or_else(|| "ANY".into()))
                } else {
                    None
                }
            });
        let Some(verb) = verb else { continue };
        let method_path = value.clone().unwrap_or_default();
        let path = join_paths(base_path, &method_path);
        if path.is_empty() {
            continue;
        }
        builder.endpoint(
            method_id,
            &verb,
            &path,
            "spring",
            method_name,
            line_start(method),
        );
    }
}

/// (annotation name, optional string value) pairs attached to a node's
/// modifiers.
fn annotations_of(node: TsNode<'_>, source: &[u8]) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    let Some(modifiers) = named_children(node)
        .into_iter()
        .find(|n| n.kind() == "modifiers")
    else {
        return out;
    };
    for modifier in named_children(modifiers) {
        match modifier.kind() {
            "marker_annotation" => {
                out.push((field_text(modifier, "name", source), None));
            }
            "annotation" => {
                let name = field_text(modifier, "name", source);
                let value = annotation_value(modifier, source);
                out.push((name, value));
            }
            _ => {}
        }
    }
    out
}

/// First string value of an annotation: `@X("/p")`, `@X(value = "/p")`,
/// or `@X(path = "/p")`.
fn annotation_value(annotation: TsNode<'_>, source: &[u8]) -> Option<String> {
    let arguments = annotation.child_by_field_name("arguments")?;
    for arg in named_children(arguments) {
        match arg.kind() {
            "string_literal" => return Some(unquote(text(arg, source))),
            "element_value_pair" => {
                let key = field_text(arg, "key", source);
                if key == "value" || key == "path" {
                    let value = arg.child_by_field_name("value")?;
                    if value.kind() == "string_literal" {
                        return Some(unquote(text(value, source)));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// `method = RequestMethod.GET` inside @RequestMapping arguments.
fn request_mapping_method(method: TsNode<'_>, source: &[u8]) -> Option<String> {
    let mut found = None;
    let mut gather = |node: TsNode<'_>| {
        if node.kind() == "element_value_pair"
            && field_text(node, "key", source) == "method"
        {
            if let Some(value) = node.child_by_field_name("value") {
                let t = text(value, source);
                if let Some(verb) = t.rsplit('.').next() {
                    found = Some(verb.to_uppercase());
                }
            }
        }
    };
    visit(method, &mut gather);
    found
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, true) => String::new(),
        (true, false) => path.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
    }
}

fn is_public(node: TsNode<'_>, source: &[u8]) -> bool {
    named_children(node)
        .into_iter()
        .find(|n| n.kind() == "modifiers")
        .is_some_and(|m| text(m, source).contains("public"))
}

/// Javadoc (or line comments) immediately above a declaration.
fn java_doc(node: TsNode<'_>, source: &[u8]) -> String {
    let Some(sibling) = node.prev_sibling() else {
        return String::new();
    };
    if sibling.kind() != "block_comment" && sibling.kind() != "line_comment" {
        return String::new();
    }
    if sibling.end_position().row + 1 != node.start_position().row {
        return String::new();
    }
    clean_block_comment(text(sibling, source))
}

fn clean_block_comment(raw: &str) -> String {
    raw.trim_start_matches("/**")
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
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
        if node.kind() == "method_invocation" {
            invocations.push(node);
        }
    };
    visit(body, &mut gather);

    for invocation in invocations {
        let method_name = field_text(invocation, "name", source);
        if method_name.is_empty() {
            continue;
        }
        let object = invocation.child_by_field_name("object");

        // REST client calls before generic resolution.
        if let Some(rest) = rest_client_call(&method_name) {
            let url = invocation
                .child_by_field_name("arguments")
                .and_then(|args| named_children(args).into_iter().next())
                .filter(|a| a.kind() == "string_literal")
                .map(|a| unquote(text(a, source)));
            if let Some(url) = url {
                builder.api_call(
                    scope_id,
                    rest,
                    &crate::strings::url_path(&url),
                    "spring-rest",
                    line_start(invocation),
                );
                continue;
            }
        }

        match object {
            // Unqualified call: a method on this class.
            None => {
                if let Some(target) = tables.methods.get(class).and_then(|m| m.get(&method_name))
                {
                    if target != scope_id {
                        builder.calls(scope_id, target, Some(&format!("{class}.{method_name}")));
                    }
                }
            }
            Some(object) if object.kind() == "identifier" => {
                let object_text = text(object, source);
                // field of a same-file class type
                if let Some(field_type) = tables
                    .fields
                    .get(class)
                    .and_then(|fields| fields.get(object_text))
                {
                    if let Some(target) = tables
                        .methods
                        .get(field_type)
                        .and_then(|m| m.get(&method_name))
                    {
                        builder.calls(
                            scope_id,
                            target,
                            Some(&format!("{field_type}.{method_name}")),
                        );
                        continue;
                    }
                }
                // static call through an import
                if let Some(dep_id) = tables.aliases.get(object_text) {
                    builder.calls(scope_id, dep_id, Some(&method_name));
                }
            }
            _ => {}
        }
    }
}

fn rest_client_call(method_name: &str) -> Option<&'static str> {
    match method_name {
        "getForObject" | "getForEntity" => Some("GET"),
        "postForObject" | "postForEntity" => Some("POST"),
        "put" => Some("PUT"),
        "delete" => Some("DELETE"),
        "exchange" => Some("UNKNOWN"),
        _ => None,
    }
}
