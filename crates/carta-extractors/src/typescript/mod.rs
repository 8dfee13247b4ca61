//! TypeScript/JavaScript extractor: ES and CommonJS imports, classes
//! with implements clauses, interfaces, express-style routes and
//! `app.use` router mounts, fetch/axios client calls, and intra-file
//! call edges.
//!
//! JavaScript is parsed with the TypeScript grammar (a superset for the
//! constructs extracted here); `.tsx`/`.jsx` use the TSX grammar.

use std::collections::HashMap;

use carta_core::{Language, NodeType};
use tree_sitter::Node as TsNode;

use crate::builder::GraphBuilder;
use crate::extractor::{ExtractError, Extractor, ParseResult};
use crate::strings::{stem, unquote, url_path};
use crate::treesitter::{
    doc_comment_above, field_text, line_end, line_start, named_children, parse_source,
    signature_before_body, text, visit,
};

pub struct TypeScriptExtractor;
pub struct JavaScriptExtractor;

const ROUTE_VERBS: [&str; 8] = [
    "get", "post", "put", "patch", "delete", "head", "options", "all",
];
const JS_SKIP_CALLS: [&str; 12] = [
    "require", "parseInt", "parseFloat", "setTimeout", "setInterval", "String", "Number",
    "Boolean", "Array", "Object", "Promise", "Symbol",
];

impl Extractor for TypeScriptExtractor {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx"]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        parse_impl(Language::TypeScript, path, content)
    }
}

impl Extractor for JavaScriptExtractor {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        parse_impl(Language::JavaScript, path, content)
    }
}

#[derive(Default)]
struct FileTables {
    /// local binding → dependency node id.
    aliases: HashMap<String, String>,
    /// function name → node id.
    functions: HashMap<String, String>,
    /// class name → method name → node id.
    methods: HashMap<String, HashMap<String, String>>,
    /// tree-sitter node id of a function-ish declaration → graph id,
    /// used to attribute calls to their enclosing scope.
    scope_by_ast: HashMap<usize, String>,
    /// tree-sitter node id → enclosing class name (for `this.` calls).
    class_by_ast: HashMap<usize, String>,
}

fn parse_impl(
    language: Language,
    path: &str,
    content: &[u8],
) -> Result<ParseResult, ExtractError> {
    let source = std::str::from_utf8(content).map_err(|_| ExtractError::Utf8(path.to_string()))?;
    let grammar: tree_sitter::Language = if path.ends_with(".tsx") || path.ends_with(".jsx") {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    } else {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    };
    let tree = parse_source(&grammar, path, content)?;
    let root = tree.root_node();

    let mut builder = GraphBuilder::new(path, language);
    builder.set_file_end(source.lines().count().max(1) as u32);
    builder.package(stem(path));

    let mut tables = FileTables::default();
    for child in named_children(root) {
        collect_statement(&mut builder, &mut tables, child, content, false);
    }

    scan_calls(&mut builder, &tables, root, content);

    Ok(builder.finish())
}

fn collect_statement(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    statement: TsNode<'_>,
    source: &[u8],
    exported: bool,
) {
    match statement.kind() {
        "export_statement" => {
            if let Some(declaration) = statement.child_by_field_name("declaration") {
                collect_statement(builder, tables, declaration, source, true);
            }
        }
        "import_statement" => collect_es_import(builder, tables, statement, source),
        "function_declaration" | "generator_function_declaration" => {
            let name = field_text(statement, "name", source);
            if name.is_empty() {
                return;
            }
            let id = builder.declaration(
                NodeType::Function,
                &name,
                line_start(statement),
                line_end(statement),
                exported,
                &signature_before_body(statement, source),
                &doc_comment_above(statement, source, &["//"]),
            );
            tables.functions.insert(name, id.clone());
            tables.scope_by_ast.insert(statement.id(), id);
        }
        "lexical_declaration" | "variable_declaration" => {
            collect_variable(builder, tables, statement, source, exported);
        }
        "class_declaration" | "abstract_class_declaration" => {
            collect_class(builder, tables, statement, source, exported);
        }
        "interface_declaration" => {
            let name = field_text(statement, "name", source);
            if name.is_empty() {
                return;
            }
            let id = builder.declaration(
                NodeType::Interface,
                &name,
                line_start(statement),
                line_end(statement),
                exported,
                &format!("interface {name}"),
                &doc_comment_above(statement, source, &["//"]),
            );
            let mut methods = Vec::new();
            if let Some(body) = statement.child_by_field_name("body") {
                for member in named_children(body) {
                    if member.kind() == "method_signature" || member.kind() == "property_signature"
                    {
                        let member_name = field_text(member, "name", source);
                        if !member_name.is_empty() {
                            methods.push(member_name);
                        }
                    }
                }
            }
            if !methods.is_empty() {
                builder.set_prop(&id, "methods", &methods.join(","));
            }
        }
        "type_alias_declaration" => {
            let name = field_text(statement, "name", source);
            if !name.is_empty() {
                builder.declaration(
                    NodeType::Type,
                    &name,
                    line_start(statement),
                    line_end(statement),
                    exported,
                    &format!("type {name}"),
                    "",
                );
            }
        }
        "enum_declaration" => {
            let name = field_text(statement, "name", source);
            if !name.is_empty() {
                builder.declaration(
                    NodeType::Enum,
                    &name,
                    line_start(statement),
                    line_end(statement),
                    exported,
                    &format!("enum {name}"),
                    "",
                );
            }
        }
        _ => {}
    }
}

fn collect_es_import(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    statement: TsNode<'_>,
    source: &[u8],
) {
    let raw = unquote(&field_text(statement, "source", source));
    if raw.is_empty() {
        return;
    }
    let dep_id = builder.import_dep(&raw, line_start(statement));
    for clause in named_children(statement) {
        if clause.kind() != "import_clause" {
            continue;
        }
        for binding in named_children(clause) {
            match binding.kind() {
                "identifier" => {
                    tables
                        .aliases
                        .insert(text(binding, source).to_string(), dep_id.clone());
                }
                "namespace_import" => {
                    if let Some(name) = named_children(binding).into_iter().next() {
                        tables
                            .aliases
                            .insert(text(name, source).to_string(), dep_id.clone());
                    }
                }
                "named_imports" => {
                    for spec in named_children(binding) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let local = spec
                            .child_by_field_name("alias")
                            .or_else(|| spec.child_by_field_name("name"));
                        if let Some(local) = local {
                            tables
                                .aliases
                                .insert(text(local, source).to_string(), dep_id.clone());
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

fn collect_variable(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    statement: TsNode<'_>,
    source: &[u8],
    exported: bool,
) {
    for declarator in named_children(statement) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let name = field_text(declarator, "name", source);
        if name.is_empty() {
            continue;
        }
        let value = declarator.child_by_field_name("value");
        match value.map(|v| v.kind()) {
            // const f = (x) => ... and const f = function(...)
            Some("arrow_function") | Some("function_expression") | Some("function") => {
                let value = value.unwrap_or(declarator);
                let id = builder.declaration(
                    NodeType::Function,
                    &name,
                    line_start(declarator),
                    line_end(declarator),
                    exported,
                    text(declarator, source).lines().next().unwrap_or("").trim(),
                    &doc_comment_above(statement, source, &["//"]),
                );
                tables.functions.insert(name, id.clone());
                tables.scope_by_ast.insert(value.id(), id);
            }
            // const x = require('mod')
            Some("call_expression") => {
                let call = value.unwrap_or(declarator);
                let func = call.child_by_field_name("function");
                if func.map(|f| text(f, source)) == Some("require") {
                    let arg = call
                        .child_by_field_name("arguments")
                        .and_then(|a| named_children(a).into_iter().next())
                        .map(|a| unquote(text(a, source)))
                        .unwrap_or_default();
                    if !arg.is_empty() {
                        let dep_id = builder.import_dep(&arg, line_start(statement));
                        tables.aliases.insert(name, dep_id);
                    }
                } else {
                    emit_plain_variable(builder, declarator, &name, source, exported);
                }
            }
            _ => {
                emit_plain_variable(builder, declarator, &name, source, exported);
            }
        }
    }
}

fn emit_plain_variable(
    builder: &mut GraphBuilder,
    declarator: TsNode<'_>,
    name: &str,
    source: &[u8],
    exported: bool,
) {
    builder.declaration(
        NodeType::Variable,
        name,
        line_start(declarator),
        line_end(declarator),
        exported,
        text(declarator, source).lines().next().unwrap_or("").trim(),
        "",
    );
}

fn collect_class(
    builder: &mut GraphBuilder,
    tables: &mut FileTables,
    class: TsNode<'_>,
    source: &[u8],
    exported: bool,
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
        exported,
        &format!("class {name}"),
        &doc_comment_above(class, source, &["//"]),
    );

    // class X extends Base implements IFoo, IBar
    let mut implements = Vec::new();
    let mut bases = Vec::new();
    let mut heritage = Vec::new();
    let mut gather = |node: TsNode<'_>| {
        if node.kind() == "extends_clause" || node.kind() == "implements_clause" {
            heritage.push(node);
        }
    };
    visit(class, &mut gather);
    for clause in heritage {
        let names: Vec<String> = named_children(clause)
            .into_iter()
            .filter(|n| {
                n.kind() == "identifier" || n.kind() == "type_identifier" || n.kind() == "generic_type"
            })
            .map(|n| {
                // Strip generic arguments: Repo<User> → Repo.
                let t = text(n, source);
                t.split('<').next().unwrap_or(t).trim().to_string()
            })
            .collect();
        if clause.kind() == "implements_clause" {
            implements.extend(names);
        } else {
            bases.extend(names);
        }
    }
    if !implements.is_empty() {
        builder.set_prop(&id, "implements", &implements.join(","));
    }
    if !bases.is_empty() {
        builder.set_prop(&id, "bases", &bases.join(","));
    }

    let Some(body) = class.child_by_field_name("body") else {
        return;
    };
    let mut fields = Vec::new();
    for member in named_children(body) {
        match member.kind() {
            "method_definition" => {
                let method_name = field_text(member, "name", source);
                if method_name.is_empty() {
                    continue;
                }
                let method_id = builder.declaration(
                    NodeType::Method,
                    &method_name,
                    line_start(member),
                    line_end(member),
                    exported,
                    &signature_before_body(member, source),
                    &doc_comment_above(member, source, &["//"]),
                );
                builder.set_prop(&method_id, "receiver", &name);
                tables
                    .methods
                    .entry(name.clone())
                    .or_default()
                    .insert(method_name, method_id.clone());
                tables.scope_by_ast.insert(member.id(), method_id);
                tables.class_by_ast.insert(member.id(), name.clone());
            }
            "public_field_definition" | "property_definition" => {
                let field_name = field_text(member, "name", source);
                if !field_name.is_empty() {
                    fields.push(field_name);
                }
            }
            _ => {}
        }
    }
    if !fields.is_empty() {
        builder.set_prop(&id, "fields", &fields.join(","));
    }
}

/// One pass over every call expression: route registrations, router
/// mounts, client calls, and intra-file calls, attributed to the nearest
/// enclosing function scope (the package stands in at module level).
fn scan_calls(
    builder: &mut GraphBuilder,
    tables: &FileTables,
    root: TsNode<'_>,
    source: &[u8],
) {
    let mut calls = Vec::new();
    let mut gather = |node: TsNode<'_>| {
        if node.kind() == "call_expression" {
            calls.push(node);
        }
    };
    visit(root, &mut gather);

    for call in calls {
        let Some(func) = call.child_by_field_name("function") else {
            continue;
        };
        let scope_id = enclosing_scope(tables, call, builder);
        let args = call
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();
        let line = line_start(call);

        match func.kind() {
            "identifier" => {
                let name = text(func, source);
                if name == "fetch" {
                    if let Some(url) = args.first().and_then(|a| resolve_string(*a, source)) {
                        let method = fetch_options_method(args.get(1).copied(), source)
                            .unwrap_or_else(|| "GET".to_string());
                        builder.api_call(&scope_id, &method, &url_path(&url), "fetch", line);
                    }
                    continue;
                }
                if JS_SKIP_CALLS.contains(&name) {
                    continue;
                }
                if let Some(target) = tables.functions.get(name) {
                    if target != &scope_id {
                        builder.calls(&scope_id, target, None);
                    }
                }
            }
            "member_expression" => {
                let Some(object) = func.child_by_field_name("object") else {
                    continue;
                };
                let property = field_text(func, "property", source);
                if property.is_empty() {
                    continue;
                }

                // this.method()
                if object.kind() == "this" {
                    if let Some(class) = enclosing_class(tables, call) {
                        if let Some(target) =
                            tables.methods.get(&class).and_then(|m| m.get(&property))
                        {
                            if target != &scope_id {
                                builder.calls(
                                    &scope_id,
                                    target,
                                    Some(&format!("{class}.{property}")),
                                );
                            }
                        }
                    }
                    continue;
                }
                if object.kind() != "identifier" {
                    continue;
                }
                let object_text = text(object, source);

                // axios.get("/x")
                if object_text == "axios" && ROUTE_VERBS.contains(&property.as_str()) {
                    if let Some(url) = args.first().and_then(|a| resolve_string(*a, source)) {
                        builder.api_call(
                            &scope_id,
                            &property.to_uppercase(),
                            &url_path(&url),
                            "axios",
                            line,
                        );
                    }
                    continue;
                }

                // app.use("/prefix", router) registers a router mount.
                if property == "use" {
                    if args.len() >= 2 {
                        if let Some(prefix) = args.first().and_then(|a| resolve_string(*a, source))
                        {
                            if prefix.starts_with('/') {
                                let router = text(args[1], source).to_string();
                                builder.router_mount(&router, &prefix, line);
                            }
                        }
                    }
                    continue;
                }

                // app.get("/x", handler) is an express-style registration.
                if ROUTE_VERBS.contains(&property.as_str()) {
                    if let Some(path) = args.first().and_then(|a| resolve_string(*a, source)) {
                        if path.starts_with('/') {
                            let method = if property == "all" {
                                "ANY".to_string()
                            } else {
                                property.to_uppercase()
                            };
                            let handler = args
                                .last()
                                .filter(|a| a.kind() == "identifier")
                                .map(|a| text(*a, source).to_string())
                                .unwrap_or_default();
                            builder.endpoint(&scope_id, &method, &path, "express", &handler, line);
                            continue;
                        }
                    }
                }

                // alias.method(): a call into an imported module.
                if let Some(dep_id) = tables.aliases.get(object_text) {
                    builder.calls(&scope_id, dep_id, Some(&property));
                }
            }
            _ => {}
        }
    }
}

fn enclosing_scope(tables: &FileTables, call: TsNode<'_>, builder: &GraphBuilder) -> String {
    let mut current = call.parent();
    while let Some(node) = current {
        if let Some(id) = tables.scope_by_ast.get(&node.id()) {
            return id.clone();
        }
        current = node.parent();
    }
    builder.package_id().to_string()
}

fn enclosing_class(tables: &FileTables, call: TsNode<'_>) -> Option<String> {
    let mut current = call.parent();
    while let Some(node) = current {
        if let Some(class) = tables.class_by_ast.get(&node.id()) {
            return Some(class.clone());
        }
        current = node.parent();
    }
    None
}

/// Pull `method: "POST"` out of a fetch options object literal.
fn fetch_options_method(options: Option<TsNode<'_>>, source: &[u8]) -> Option<String> {
    let options = options?;
    if options.kind() != "object" {
        return None;
    }
    for pair in named_children(options) {
        if pair.kind() != "pair" {
            continue;
        }
        let key = field_text(pair, "key", source);
        if key == "method" || key == "\"method\"" {
            let value = pair.child_by_field_name("value")?;
            return Some(unquote(text(value, source)).to_uppercase());
        }
    }
    None
}

/// Resolve a string/template expression; template substitutions collapse
/// onto the literal prefix with a trailing `*`.
fn resolve_string(node: TsNode<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => Some(unquote(text(node, source))),
        "template_string" => {
            let mut out = String::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "string_fragment" => out.push_str(text(child, source)),
                    "template_substitution" => {
                        out.push('*');
                        return Some(out);
                    }
                    _ => {}
                }
            }
            Some(out)
        }
        "binary_expression" => {
            let left = node.child_by_field_name("left")?;
            let resolved = resolve_string(left, source)?;
            if resolved.ends_with('*') {
                return Some(resolved);
            }
            match node
                .child_by_field_name("right")
                .and_then(|r| resolve_string(r, source))
            {
                Some(right) => Some(resolved + &right),
                None => Some(format!("{resolved}*")),
            }
        }
        "parenthesized_expression" => named_children(node)
            .first()
            .and_then(|inner| resolve_string(*inner, source)),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
