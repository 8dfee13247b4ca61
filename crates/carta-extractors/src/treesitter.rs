//! Shared tree-sitter plumbing for the language extractors.

use tree_sitter::{Node, Parser, Tree};

use crate::extractor::ExtractError;

/// Parse `source` with the given grammar, mapping failures to
/// [`ExtractError::Parse`] carrying the file path.
pub fn parse_source(
    grammar: &tree_sitter::Language,
    path: &str,
    source: &[u8],
) -> Result<Tree, ExtractError> {
    let mut parser = Parser::new();
    parser
        .set_language(grammar)
        .map_err(|e| ExtractError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
    parser.parse(source, None).ok_or_else(|| ExtractError::Parse {
        path: path.to_string(),
        message: "tree-sitter produced no tree".to_string(),
    })
}

pub fn text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

pub fn line_start(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

pub fn line_end(node: Node<'_>) -> u32 {
    node.end_position().row as u32 + 1
}

/// Collects the named children of a node.
pub fn named_children<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// First named child of the given kind.
pub fn child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    named_children(node).into_iter().find(|c| c.kind() == kind)
}

/// Text of the child bound to `field`, or empty.
pub fn field_text(node: Node<'_>, field: &str, source: &[u8]) -> String {
    node.child_by_field_name(field)
        .map(|c| text(c, source).to_string())
        .unwrap_or_default()
}

/// Depth-first visit over all named descendants, including `node` itself.
pub fn visit<'a, F: FnMut(Node<'a>)>(node: Node<'a>, f: &mut F) {
    f(node);
    for child in named_children(node) {
        visit(child, f);
    }
}

/// Collect the contiguous block of line comments immediately above a
/// declaration. `markers` are comment prefixes to strip (e.g. `"//"`,
/// `"#"`, `"///"`; list the longest first).
pub fn doc_comment_above(node: Node<'_>, source: &[u8], markers: &[&str]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut expected_row = node.start_position().row;
    let mut current = node.prev_sibling();
    while let Some(sib) = current {
        let kind = sib.kind();
        if !(kind == "comment" || kind == "line_comment" || kind == "block_comment") {
            break;
        }
        let end_row = sib.end_position().row;
        if end_row + 1 != expected_row {
            break;
        }
        let raw = text(sib, source);
        let mut stripped = raw;
        for marker in markers {
            if let Some(rest) = stripped.strip_prefix(marker) {
                stripped = rest;
                break;
            }
        }
        lines.push(stripped.trim().to_string());
        expected_row = sib.start_position().row;
        current = sib.prev_sibling();
    }
    lines.reverse();
    lines.join("\n")
}

/// Slice of the declaration text up to (not including) its body, the
/// conventional signature string.
pub fn signature_before_body(node: Node<'_>, source: &[u8]) -> String {
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let start = node.start_byte();
    if end <= start || end > source.len() {
        return String::new();
    }
    String::from_utf8_lossy(&source[start..end]).trim().to_string()
}
