//! HTTP route and client-call recognition for Go.
//!
//! Handles verb routers (gin/echo/chi), `net/http` and gorilla `mux`
//! registrations including the `.HandleFunc(...).Methods("GET")` chain,
//! in-function `.Group("/prefix")` tracking, and outbound `net/http`
//! client calls with concatenated-URL wildcarding.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node as TsNode;

use super::{FileTables, FnScope};
use crate::builder::GraphBuilder;
use crate::strings::{unquote, url_path};
use crate::treesitter::{line_start, named_children, text, visit};

const ROUTE_VERBS: [&str; 8] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "Any",
];

pub(super) fn detect_framework(import_paths: &HashSet<String>) -> &'static str {
    if import_paths.iter().any(|p| p.contains("labstack/echo")) {
        "echo"
    } else if import_paths.iter().any(|p| p.contains("go-chi/chi")) {
        "chi"
    } else {
        "gin"
    }
}

pub(super) fn scan<'a>(
    builder: &mut GraphBuilder,
    scope: &FnScope<'_>,
    tables: &FileTables,
    source: &[u8],
    body: TsNode<'a>,
    framework: &'static str,
) {
    let groups = collect_group_prefixes(body, source);
    let has_mux = tables
        .import_paths
        .iter()
        .any(|p| p.contains("gorilla/mux"));

    let mut calls = Vec::new();
    let mut gather = |node: TsNode<'a>| {
        if node.kind() == "call_expression" {
            calls.push(node);
        }
    };
    visit(body, &mut gather);

    // DFS pre-order: a wrapping `.Methods(...)` call is visited before the
    // registration call it consumes.
    let mut consumed: HashSet<usize> = HashSet::new();

    for call in calls {
        if consumed.contains(&call.id()) {
            continue;
        }
        let Some(func) = call.child_by_field_name("function") else {
            continue;
        };
        if func.kind() != "selector_expression" {
            continue;
        }
        let Some(operand) = func.child_by_field_name("operand") else {
            continue;
        };
        let field = func
            .child_by_field_name("field")
            .map(|f| text(f, source).to_string())
            .unwrap_or_default();
        let args = call_args(call);

        // Chained method spec: .HandleFunc("/x", h).Methods("GET")
        if field == "Methods" && operand.kind() == "call_expression" {
            if let Some((inner_field, inner_args)) = registration_parts(operand, source) {
                if inner_field == "HandleFunc" || inner_field == "Handle" {
                    consumed.insert(operand.id());
                    let path = string_arg(&inner_args, 0, source);
                    let method = string_arg(&args, 0, source).to_uppercase();
                    if !path.is_empty() && !method.is_empty() {
                        let handler = arg_text(&inner_args, 1, source);
                        builder.endpoint(
                            &scope.id,
                            &method,
                            &path,
                            "mux",
                            &handler,
                            line_start(call),
                        );
                    }
                    continue;
                }
            }
        }

        // Verb routers: api.GET("/users", listUsers)
        if ROUTE_VERBS.contains(&field.as_str()) {
            let raw_path = string_arg(&args, 0, source);
            if raw_path.is_empty() {
                continue;
            }
            let prefix = operand_prefix(operand, source, &groups);
            let path = join_route(&prefix, &raw_path);
            let method = if field == "Any" {
                "ANY".to_string()
            } else {
                field.clone()
            };
            let handler = arg_text(&args, args.len().saturating_sub(1), source);
            builder.endpoint(&scope.id, &method, &path, framework, &handler, line_start(call));
            continue;
        }

        // r.Handle("GET", "/path", h) or r.Handle("/path", h)
        if field == "Handle" {
            let first = string_arg(&args, 0, source);
            if first.is_empty() {
                continue;
            }
            let prefix = operand_prefix(operand, source, &groups);
            if is_http_verb(&first) {
                let path = string_arg(&args, 1, source);
                if !path.is_empty() {
                    let handler = arg_text(&args, 2, source);
                    builder.endpoint(
                        &scope.id,
                        &first.to_uppercase(),
                        &join_route(&prefix, &path),
                        framework,
                        &handler,
                        line_start(call),
                    );
                }
            } else {
                let handler = arg_text(&args, 1, source);
                builder.endpoint(
                    &scope.id,
                    "ANY",
                    &join_route(&prefix, &first),
                    framework,
                    &handler,
                    line_start(call),
                );
            }
            continue;
        }

        // Generic registration: mux.HandleFunc("/x", handler)
        if field == "HandleFunc" {
            let path = string_arg(&args, 0, source);
            if path.is_empty() {
                continue;
            }
            let handler = arg_text(&args, 1, source);
            let fw = if has_mux { "mux" } else { "net/http" };
            builder.endpoint(&scope.id, "ANY", &path, fw, &handler, line_start(call));
            continue;
        }

        // Outbound client calls.
        if operand.kind() == "identifier" {
            let operand_text = text(operand, source);
            if tables.alias_paths.get(operand_text).map(String::as_str) == Some("net/http") {
                let method = match field.as_str() {
                    "Get" => "GET",
                    "Post" | "PostForm" => "POST",
                    "Head" => "HEAD",
                    _ => "",
                };
                if !method.is_empty() {
                    if let Some(url) =
                        args.first().and_then(|a| resolve_string_expr(*a, source, &tables.consts))
                    {
                        builder.api_call(
                            &scope.id,
                            method,
                            &url_path(&url),
                            "net/http",
                            line_start(call),
                        );
                    }
                    continue;
                }
            }
            // client.Do(req): method not statically known.
            if field == "Do" && args.len() == 1 {
                builder.api_call(&scope.id, "UNKNOWN", "UNKNOWN", "net/http", line_start(call));
            }
        }
    }
}

/// Track `api := r.Group("/api/v1")` assignments (and nested groups) so
/// in-function route registrations get their prefix prepended.
fn collect_group_prefixes<'a>(body: TsNode<'a>, source: &[u8]) -> HashMap<String, String> {
    let mut groups: HashMap<String, String> = HashMap::new();
    let mut decls = Vec::new();
    let mut gather = |node: TsNode<'a>| {
        if node.kind() == "short_var_declaration" || node.kind() == "assignment_statement" {
            decls.push(node);
        }
    };
    visit(body, &mut gather);

    for decl in decls {
        let Some(left) = decl.child_by_field_name("left") else {
            continue;
        };
        let Some(right) = decl.child_by_field_name("right") else {
            continue;
        };
        let var = named_children(left)
            .first()
            .filter(|n| n.kind() == "identifier")
            .map(|n| text(*n, source).to_string());
        let call = named_children(right)
            .into_iter()
            .find(|n| n.kind() == "call_expression");
        let (Some(var), Some(call)) = (var, call) else {
            continue;
        };
        let Some((field, args)) = registration_parts(call, source) else {
            continue;
        };
        if field != "Group" {
            continue;
        }
        let prefix = string_arg(&args, 0, source);
        if prefix.is_empty() {
            continue;
        }
        let parent_prefix = call
            .child_by_field_name("function")
            .and_then(|f| f.child_by_field_name("operand"))
            .map(|op| operand_prefix(op, source, &groups))
            .unwrap_or_default();
        groups.insert(var, join_route(&parent_prefix, &prefix));
    }
    groups
}

/// For a selector call, returns the selector field name and argument
/// nodes.
fn registration_parts<'a>(
    call: TsNode<'a>,
    source: &[u8],
) -> Option<(String, Vec<TsNode<'a>>)> {
    let func = call.child_by_field_name("function")?;
    if func.kind() != "selector_expression" {
        return None;
    }
    let field = text(func.child_by_field_name("field")?, source).to_string();
    Some((field, call_args(call)))
}

fn call_args(call: TsNode<'_>) -> Vec<TsNode<'_>> {
    call.child_by_field_name("arguments")
        .map(named_children)
        .unwrap_or_default()
}

fn string_arg(args: &[TsNode<'_>], index: usize, source: &[u8]) -> String {
    args.get(index)
        .filter(|a| {
            a.kind() == "interpreted_string_literal" || a.kind() == "raw_string_literal"
        })
        .map(|a| unquote(text(*a, source)))
        .unwrap_or_default()
}

fn arg_text(args: &[TsNode<'_>], index: usize, source: &[u8]) -> String {
    args.get(index).map(|a| text(*a, source).to_string()).unwrap_or_default()
}

fn operand_prefix(
    operand: TsNode<'_>,
    source: &[u8],
    groups: &HashMap<String, String>,
) -> String {
    if operand.kind() == "identifier" {
        groups.get(text(operand, source)).cloned().unwrap_or_default()
    } else {
        String::new()
    }
}

fn join_route(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    let joined = format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'));
    joined.trim_end_matches('/').to_string()
}

fn is_http_verb(s: &str) -> bool {
    matches!(
        s.to_uppercase().as_str(),
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS"
    )
}

/// Resolve a URL argument to a string, substituting same-file string
/// constants and collapsing non-literal concatenation onto the left-most
/// resolvable prefix with a trailing `*`.
pub(super) fn resolve_string_expr(
    node: TsNode<'_>,
    source: &[u8],
    consts: &HashMap<String, String>,
) -> Option<String> {
    match resolve_inner(node, source, consts) {
        Resolved::Full(s) => Some(s),
        Resolved::Prefix(s) if !s.is_empty() => Some(format!("{s}*")),
        _ => None,
    }
}

enum Resolved {
    Full(String),
    Prefix(String),
    None,
}

fn resolve_inner(
    node: TsNode<'_>,
    source: &[u8],
    consts: &HashMap<String, String>,
) -> Resolved {
    match node.kind() {
        "interpreted_string_literal" | "raw_string_literal" => {
            Resolved::Full(unquote(text(node, source)))
        }
        "identifier" => match consts.get(text(node, source)) {
            Some(value) => Resolved::Full(value.clone()),
            None => Resolved::None,
        },
        "binary_expression" => {
            let (Some(left), Some(right)) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) else {
                return Resolved::None;
            };
            match resolve_inner(left, source, consts) {
                Resolved::Full(l) => match resolve_inner(right, source, consts) {
                    Resolved::Full(r) => Resolved::Full(l + &r),
                    Resolved::Prefix(r) => Resolved::Prefix(l + &r),
                    Resolved::None => Resolved::Prefix(l),
                },
                // Once the left side is cut short, the rest is unknowable.
                Resolved::Prefix(l) => Resolved::Prefix(l),
                Resolved::None => Resolved::None,
            }
        }
        "parenthesized_expression" => named_children(node)
            .first()
            .map(|inner| resolve_inner(*inner, source, consts))
            .unwrap_or(Resolved::None),
        _ => Resolved::None,
    }
}
