use carta_core::{EdgeType, GraphStore, NodeType};

use crate::common::{find_node, index_and_link};

#[test]
fn test_go_test_file_links_to_source_file() {
    let (store, token, _) = index_and_link(&[
        ("pkg/graph/graph.go", "package graph\n\nfunc AddNode() {}\n"),
        (
            "pkg/graph/graph_test.go",
            "package graph\n\nfunc TestAddNode(t *testing.T) {}\n",
        ),
    ]);

    let test_file = find_node(&store, &token, NodeType::TestFile, "graph_test.go");
    let edges = store
        .edges_for(&token, &test_file.id, Some(EdgeType::Tests))
        .unwrap();
    let file_edge = edges
        .iter()
        .find(|e| e.properties.get("kind").map(String::as_str) == Some("file_coverage"))
        .expect("file coverage edge");
    let target = store.get_node(&token, &file_edge.target_id).unwrap().unwrap();
    assert_eq!(target.file_path, "pkg/graph/graph.go");
}

#[test]
fn test_go_test_function_links_to_function() {
    let (store, token, _) = index_and_link(&[
        ("pkg/graph/graph.go", "package graph\n\nfunc AddNode() {}\n"),
        (
            "pkg/graph/graph_test.go",
            "package graph\n\nfunc TestAddNode(t *testing.T) {}\n",
        ),
    ]);

    let test_fn = find_node(&store, &token, NodeType::TestFunction, "TestAddNode");
    let source_fn = find_node(&store, &token, NodeType::Function, "AddNode");
    let edges = store
        .edges_for(&token, &test_fn.id, Some(EdgeType::Tests))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, source_fn.id);
    assert_eq!(edges[0].properties["kind"], "function_coverage");
}

#[test]
fn test_composite_go_test_name_links_to_method() {
    let (store, token, _) = index_and_link(&[
        (
            "internal/store/store.go",
            r#"package store

type EmbeddedStore struct {
	path string
}

func (s *EmbeddedStore) AddNode(id string) error { return nil }
"#,
        ),
        (
            "internal/store/store_test.go",
            "package store\n\nfunc TestEmbeddedStore_AddNode(t *testing.T) {}\n",
        ),
    ]);

    let test_fn = find_node(&store, &token, NodeType::TestFunction, "TestEmbeddedStore_AddNode");
    let method = find_node(&store, &token, NodeType::Method, "AddNode");
    let edges = store
        .edges_for(&token, &test_fn.id, Some(EdgeType::Tests))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, method.id);
}

#[test]
fn test_java_camel_case_bridging() {
    let (store, token, _) = index_and_link(&[
        (
            "api/src/UserService.java",
            r#"package com.acme;

public class UserService {
    public void createUser() {}
}
"#,
        ),
        (
            "api/src/UserServiceTest.java",
            r#"package com.acme;

public class UserServiceTest {
    public void testCreateUser() {}
}
"#,
        ),
    ]);

    let test_fn = find_node(&store, &token, NodeType::TestFunction, "testCreateUser");
    let method = find_node(&store, &token, NodeType::Method, "createUser");
    let edges = store
        .edges_for(&token, &test_fn.id, Some(EdgeType::Tests))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, method.id);
}

#[test]
fn test_rust_integration_test_reaches_into_src() {
    let (store, token, _) = index_and_link(&[
        ("mycrate/src/parsing.rs", "pub fn parse() {}\n"),
        ("mycrate/tests/parsing.rs", "fn test_parse() {}\n"),
    ]);

    let test_file = find_node(&store, &token, NodeType::TestFile, "parsing.rs");
    let edges = store
        .edges_for(&token, &test_file.id, Some(EdgeType::Tests))
        .unwrap();
    let file_edge = edges
        .iter()
        .find(|e| e.properties.get("kind").map(String::as_str) == Some("file_coverage"))
        .expect("file coverage edge");
    let target = store.get_node(&token, &file_edge.target_id).unwrap().unwrap();
    assert_eq!(target.file_path, "mycrate/src/parsing.rs");
}
