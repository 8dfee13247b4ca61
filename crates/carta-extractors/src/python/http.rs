//! Decorator-route, router-mount, and client-call recognition for Python.
//!
//! FastAPI-style verb decorators (`@router.get("/x")`), Flask
//! `@app.route("/x", methods=[...])`, `include_router(..., prefix=...)`
//! mounts, `APIRouter(prefix=...)` constructions, and requests/httpx
//! outbound calls.

use tree_sitter::Node as TsNode;

use crate::builder::GraphBuilder;
use crate::strings::{unquote, url_path};
use crate::treesitter::{field_text, line_start, named_children, text, visit};

const HTTP_VERBS: [&str; 7] = ["get", "post", "put", "patch", "delete", "head", "options"];
const CLIENT_MODULES: [&str; 2] = ["requests", "httpx"];

pub(super) fn scan_route_decorators(
    builder: &mut GraphBuilder,
    handler_id: &str,
    handler_name: &str,
    decorators: &[TsNode<'_>],
    source: &[u8],
) {
    for decorator in decorators {
        let Some(expr) = named_children(*decorator).into_iter().next() else {
            continue;
        };
        if expr.kind() != "call" {
            continue;
        }
        let Some(func) = expr.child_by_field_name("function") else {
            continue;
        };
        if func.kind() != "attribute" {
            continue;
        }
        let attr = field_text(func, "attribute", source);
        let args = call_args(expr, source);
        let path = args
            .positional
            .first()
            .and_then(|a| resolve_string(*a, source))
            .unwrap_or_default();
        if path.is_empty() {
            continue;
        }
        let line = line_start(*decorator);

        if HTTP_VERBS.contains(&attr.as_str()) {
            builder.endpoint(
                handler_id,
                &attr.to_uppercase(),
                &path,
                "fastapi",
                handler_name,
                line,
            );
        } else if attr == "route" {
            let methods = args
                .keyword("methods")
                .map(|value| string_list(value, source))
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| vec!["GET".to_string()]);
            for method in methods {
                builder.endpoint(
                    handler_id,
                    &method.to_uppercase(),
                    &path,
                    "flask",
                    handler_name,
                    line,
                );
            }
        }
    }
}

/// Router mounts recorded for the linker's endpoint phase:
/// `app.include_router(instances.router, prefix="/api/v1")` and
/// `router = APIRouter(prefix="/instances")`.
pub(super) fn collect_router_mounts<'a>(
    builder: &mut GraphBuilder,
    root: TsNode<'a>,
    source: &[u8],
) {
    let mut calls = Vec::new();
    let mut assignments = Vec::new();
    let mut gather = |node: TsNode<'a>| match node.kind() {
        "call" => calls.push(node),
        "assignment" => assignments.push(node),
        _ => {}
    };
    visit(root, &mut gather);

    for call in &calls {
        let Some(func) = call.child_by_field_name("function") else {
            continue;
        };
        if func.kind() != "attribute" || field_text(func, "attribute", source) != "include_router"
        {
            continue;
        }
        let args = call_args(*call, source);
        let Some(prefix) = args
            .keyword("prefix")
            .and_then(|value| resolve_string(value, source))
        else {
            continue;
        };
        let router = args
            .positional
            .first()
            .map(|a| text(*a, source).to_string())
            .unwrap_or_else(|| "router".to_string());
        builder.router_mount(&router, &prefix, line_start(*call));
    }

    for assignment in &assignments {
        let (Some(left), Some(right)) = (
            assignment.child_by_field_name("left"),
            assignment.child_by_field_name("right"),
        ) else {
            continue;
        };
        if left.kind() != "identifier" || right.kind() != "call" {
            continue;
        }
        let Some(func) = right.child_by_field_name("function") else {
            continue;
        };
        if text(func, source) != "APIRouter" {
            continue;
        }
        let args = call_args(right, source);
        if let Some(prefix) = args
            .keyword("prefix")
            .and_then(|value| resolve_string(value, source))
        {
            builder.router_mount(text(left, source), &prefix, line_start(*assignment));
        }
    }
}

pub(super) fn scan_api_calls<'a>(
    builder: &mut GraphBuilder,
    scope_id: &str,
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
        if func.kind() != "attribute" {
            continue;
        }
        let object = field_text(func, "object", source);
        if !CLIENT_MODULES.contains(&object.as_str()) {
            continue;
        }
        let attr = field_text(func, "attribute", source);
        let args = call_args(call, source);
        let line = line_start(call);
        let framework = if object == "requests" { "requests" } else { "httpx" };

        if HTTP_VERBS.contains(&attr.as_str()) {
            let Some(url) = args
                .positional
                .first()
                .and_then(|a| resolve_string(*a, source))
            else {
                continue;
            };
            builder.api_call(scope_id, &attr.to_uppercase(), &url_path(&url), framework, line);
        } else if attr == "request" {
            let method = args
                .positional
                .first()
                .and_then(|a| resolve_string(*a, source))
                .map(|m| m.to_uppercase())
                .unwrap_or_else(|| "UNKNOWN".to_string());
            let path = args
                .positional
                .get(1)
                .and_then(|a| resolve_string(*a, source))
                .map(|u| url_path(&u))
                .unwrap_or_else(|| "UNKNOWN".to_string());
            builder.api_call(scope_id, &method, &path, framework, line);
        }
    }
}

struct CallArgs<'a> {
    positional: Vec<TsNode<'a>>,
    keywords: Vec<(String, TsNode<'a>)>,
}

impl<'a> CallArgs<'a> {
    fn keyword(&self, name: &str) -> Option<TsNode<'a>> {
        self.keywords
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }
}

fn call_args<'a>(call: TsNode<'a>, source: &[u8]) -> CallArgs<'a> {
    let mut positional = Vec::new();
    let mut keywords = Vec::new();
    if let Some(arguments) = call.child_by_field_name("arguments") {
        for arg in named_children(arguments) {
            if arg.kind() == "keyword_argument" {
                if let (Some(name), Some(value)) = (
                    arg.child_by_field_name("name"),
                    arg.child_by_field_name("value"),
                ) {
                    keywords.push((text(name, source).to_string(), value));
                }
            } else {
                positional.push(arg);
            }
        }
    }
    CallArgs { positional, keywords }
}

/// Resolve a Python string expression. F-string interpolations collapse
/// onto the literal prefix with a trailing `*`; `+` concatenation keeps
/// the left-most resolvable prefix.
fn resolve_string(node: TsNode<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => {
            let mut out = String::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "string_content" => out.push_str(text(child, source)),
                    "interpolation" => {
                        out.push('*');
                        return Some(out);
                    }
                    _ => {}
                }
            }
            Some(out)
        }
        "concatenated_string" => {
            let mut out = String::new();
            for child in named_children(node) {
                match resolve_string(child, source) {
                    Some(part) => {
                        let wildcard = part.ends_with('*');
                        out.push_str(&part);
                        if wildcard {
                            return Some(out);
                        }
                    }
                    None => {
                        out.push('*');
                        return Some(out);
                    }
                }
            }
            Some(out)
        }
        "binary_operator" => {
            let left = node.child_by_field_name("left")?;
            let resolved = resolve_string(left, source)?;
            if resolved.ends_with('*') {
                return Some(resolved);
            }
            match node.child_by_field_name("right").and_then(|r| resolve_string(r, source)) {
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

fn string_list(node: TsNode<'_>, source: &[u8]) -> Vec<String> {
    if node.kind() != "list" && node.kind() != "tuple" {
        return Vec::new();
    }
    named_children(node)
        .into_iter()
        .filter(|n| n.kind() == "string")
        .map(|n| unquote(text(n, source)))
        .collect()
}
