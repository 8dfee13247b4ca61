//! Phase 7: test coverage links: test files to the source files they
//! cover, and test functions to the functions/methods they exercise.

use std::collections::HashMap;

use carta_core::{Edge, EdgeType, GraphError, Node, NodeType};

use carta_extractors::testkind;

use crate::linker::{node_language, LinkContext};

pub(crate) fn run(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let mut added = 0;
    added += link_test_files(ctx)?;
    added += link_test_functions(ctx)?;
    Ok(added)
}

/// TestFile → File edges (`kind = "file_coverage"`): first candidate
/// source path that exists as a File node wins.
fn link_test_files(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let test_files = ctx.nodes_of(NodeType::TestFile)?;
    if test_files.is_empty() {
        return Ok(0);
    }
    let files = ctx.nodes_of(NodeType::File)?;
    let by_path: HashMap<&str, &Node> =
        files.iter().map(|f| (f.file_path.as_str(), f)).collect();

    let mut added = 0;
    for test_file in &test_files {
        let language = node_language(test_file);
        for candidate in testkind::candidate_source_files(language, &test_file.file_path) {
            let Some(source) = by_path.get(candidate.as_str()) else {
                continue;
            };
            let edge = Edge::new(EdgeType::Tests, &test_file.id, &source.id)
                .with_prop("kind", "file_coverage");
            if ctx.add_edge(&edge)? {
                added += 1;
            }
            break;
        }
    }
    Ok(added)
}

/// TestFunction → Function/Method edges (`kind = "function_coverage"`).
/// Candidate names are tried against functions in the same directory,
/// then methods in the same directory, then the same package; first hit
/// wins.
fn link_test_functions(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let test_functions = ctx.nodes_of(NodeType::TestFunction)?;
    if test_functions.is_empty() {
        return Ok(0);
    }

    let functions = ctx.nodes_of(NodeType::Function)?;
    let methods = ctx.nodes_of(NodeType::Method)?;

    let dir_functions = index_by(&functions, |n| dirname(&n.file_path));
    let dir_methods = index_by(&methods, |n| dirname(&n.file_path));
    let pkg_functions = index_by(&functions, |n| n.package.as_str());
    let pkg_methods = index_by(&methods, |n| n.package.as_str());

    let mut added = 0;
    for test in &test_functions {
        let language = node_language(test);
        let dir = dirname(&test.file_path);
        let package = test.package.as_str();

        let target = testkind::candidate_source_names(language, &test.name)
            .into_iter()
            .find_map(|candidate| {
                lookup(&dir_functions, dir, &candidate)
                    .or_else(|| lookup(&dir_methods, dir, &candidate))
                    .or_else(|| lookup(&pkg_functions, package, &candidate))
                    .or_else(|| lookup(&pkg_methods, package, &candidate))
            });

        if let Some(target) = target {
            let edge = Edge::new(EdgeType::Tests, &test.id, &target.id)
                .with_prop("kind", "function_coverage");
            if ctx.add_edge(&edge)? {
                added += 1;
            }
        }
    }
    Ok(added)
}

type NameIndex<'a> = HashMap<(&'a str, &'a str), &'a Node>;

fn index_by<'a>(nodes: &'a [Node], key: fn(&'a Node) -> &'a str) -> NameIndex<'a> {
    let mut index = NameIndex::new();
    for node in nodes {
        // First in stable query order wins.
        index.entry((key(node), node.name.as_str())).or_insert(node);
    }
    index
}

fn lookup<'a>(index: &NameIndex<'a>, scope: &str, name: &str) -> Option<&'a Node> {
    index.get(&(scope, name)).copied()
}

fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
