use carta_core::{EdgeType, GraphStore, NodeFilter, NodeType};

use crate::common::index_and_link;

#[test]
fn test_python_import_binds_to_hyphenated_manifest_dep() {
    let main = r#"from llm_framework.core import Engine

def run():
    return Engine()
"#;
    let pyproject = r#"[project]
name = "hypatia"
version = "1.0.0"
dependencies = ["llm-framework==1.2.0"]
"#;
    let (store, token, _) = index_and_link(&[
        ("hypatia/src/main.py", main),
        ("hypatia/pyproject.toml", pyproject),
    ]);

    let import = store
        .find_nodes(
            &token,
            &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "import"),
        )
        .unwrap()
        .into_iter()
        .find(|n| n.name == "llm_framework.core")
        .expect("import dependency");
    let manifest_dep = store
        .find_nodes(
            &token,
            &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "manifest_dep"),
        )
        .unwrap()
        .into_iter()
        .find(|n| n.name == "llm-framework")
        .expect("manifest dependency");

    let edges = store
        .edges_for(&token, &import.id, Some(EdgeType::DependsOn))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, manifest_dep.id);
    assert_eq!(edges[0].properties["kind"], "import_to_manifest");
}

#[test]
fn test_go_import_longest_prefix_wins() {
    let source = r#"package svc

import "github.com/acme/toolkit/sub/feature"
"#;
    let gomod = r#"module github.com/acme/svc

require (
	github.com/acme/toolkit v1.0.0
	github.com/acme/toolkit/sub v1.1.0
)
"#;
    let (store, token, _) = index_and_link(&[
        ("svc/main.go", source),
        ("svc/go.mod", gomod),
    ]);

    let import = store
        .find_nodes(
            &token,
            &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "import"),
        )
        .unwrap()
        .into_iter()
        .find(|n| n.name == "github.com/acme/toolkit/sub/feature")
        .expect("import dependency");
    let edges = store
        .edges_for(&token, &import.id, Some(EdgeType::DependsOn))
        .unwrap();
    assert_eq!(edges.len(), 1);

    let target = store
        .get_node(&token, &edges[0].target_id)
        .unwrap()
        .expect("target node");
    assert_eq!(target.name, "github.com/acme/toolkit/sub");
}
