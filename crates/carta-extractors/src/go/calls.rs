//! Intra-file call-edge extraction for Go.
//!
//! Resolves bare calls against the file's function table, alias calls
//! against import dependencies, and typed-receiver field chains
//! (`s.store.index.Lookup(...)`) through the struct field-type tables.

use tree_sitter::Node as TsNode;

use super::{FileTables, FnScope};
use crate::builder::GraphBuilder;
use crate::treesitter::{text, visit};

const GO_BUILTINS: [&str; 14] = [
    "len", "cap", "make", "new", "append", "copy", "delete", "close", "panic", "recover",
    "print", "println", "min", "max",
];

pub(super) fn scan<'a>(
    builder: &mut GraphBuilder,
    scope: &FnScope<'_>,
    tables: &FileTables,
    source: &[u8],
    body: TsNode<'a>,
) {
    let mut calls = Vec::new();
    let mut gather = |node: TsNode<'a>| {
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
                if GO_BUILTINS.contains(&name) || name == scope.name {
                    continue;
                }
                if let Some(target) = tables.functions.get(name) {
                    if target != &scope.id {
                        builder.calls(&scope.id, target, None);
                    }
                }
            }
            "selector_expression" => {
                resolve_selector_call(builder, scope, tables, source, func);
            }
            _ => {}
        }
    }
}

fn resolve_selector_call(
    builder: &mut GraphBuilder,
    scope: &FnScope<'_>,
    tables: &FileTables,
    source: &[u8],
    selector: TsNode<'_>,
) {
    let Some((root, chain)) = flatten_selector(selector, source) else {
        return;
    };
    let Some((method, fields)) = chain.split_last() else {
        return;
    };

    // alias.Method(...): a call into an imported package.
    if fields.is_empty() {
        if let Some(dep_id) = tables.aliases.get(&root) {
            builder.calls(&scope.id, dep_id, Some(method));
            return;
        }
    }

    // Chains must root at the method's receiver parameter.
    let (Some(receiver_var), Some(receiver_type)) =
        (scope.receiver_var.as_deref(), scope.receiver_type.as_deref())
    else {
        return;
    };
    if root != receiver_var {
        return;
    }

    let mut current = receiver_type.to_string();
    for (i, field) in fields.iter().enumerate() {
        let Some(field_type) = tables
            .struct_fields
            .get(&current)
            .and_then(|fields| fields.get(field.as_str()))
        else {
            return;
        };
        let cleaned = clean_type(field_type);
        if let Some((pkg, type_name)) = cleaned.split_once('.') {
            // Foreign-package type: only resolvable as the final field,
            // landing on that package's dependency node.
            if i + 1 == fields.len() {
                if let Some(dep_id) = tables.aliases.get(pkg) {
                    builder.calls(&scope.id, dep_id, Some(&format!("{type_name}.{method}")));
                }
            }
            return;
        }
        current = cleaned;
    }

    let Some(target) = tables
        .methods
        .get(&current)
        .and_then(|methods| methods.get(method.as_str()))
    else {
        return;
    };
    if target != &scope.id {
        let qualified = format!("{current}.{method}");
        builder.calls(&scope.id, target, Some(&qualified));
    }
}

/// Flatten `a.b.c.D` into ("a", ["b", "c", "D"]). Returns None when the
/// chain does not root at a plain identifier.
fn flatten_selector(selector: TsNode<'_>, source: &[u8]) -> Option<(String, Vec<String>)> {
    let mut chain = Vec::new();
    let mut current = selector;
    loop {
        let field = current.child_by_field_name("field")?;
        chain.push(text(field, source).to_string());
        let operand = current.child_by_field_name("operand")?;
        match operand.kind() {
            "selector_expression" => current = operand,
            "identifier" => {
                chain.reverse();
                return Some((text(operand, source).to_string(), chain));
            }
            _ => return None,
        }
    }
}

fn clean_type(type_text: &str) -> String {
    type_text
        .trim_start_matches('*')
        .trim_start_matches("[]")
        .trim_start_matches('*')
        .trim()
        .to_string()
}
