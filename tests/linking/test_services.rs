use carta_core::{EdgeDirection, EdgeType, GraphStore, NodeFilter, NodeType};

use crate::common::{find_node, index_and_link};

#[test]
fn test_auto_detected_services_group_files_by_top_dir() {
    let (store, token, _) = index_and_link(&[
        ("backend/api.go", "package api\n"),
        ("backend/util.go", "package api\n"),
        ("frontend/app.ts", "export function render() {}\n"),
    ]);

    let backend = find_node(&store, &token, NodeType::Service, "backend");
    assert_eq!(backend.file_path, "");
    assert_eq!(backend.properties["kind"], "auto_detected");

    let contained = store
        .neighbors(&token, &backend.id, EdgeType::Contains, EdgeDirection::Outgoing)
        .unwrap();
    assert_eq!(contained.len(), 2);
    find_node(&store, &token, NodeType::Service, "frontend");
}

#[test]
fn test_root_level_files_group_under_root_token() {
    let (store, token, _) = index_and_link(&[("main.go", "package main\n")]);
    let root = find_node(&store, &token, NodeType::Service, "(root)");
    assert_eq!(root.properties["kind"], "auto_detected");
    let contained = store
        .neighbors(&token, &root.id, EdgeType::Contains, EdgeDirection::Outgoing)
        .unwrap();
    assert_eq!(contained.len(), 1);
    assert_eq!(contained[0].file_path, "main.go");
}

#[test]
fn test_manifest_service_not_overwritten() {
    let (store, token, _) = index_and_link(&[
        (
            "users/pyproject.toml",
            "[project]\nname = \"users-api\"\nversion = \"2.0\"\ndependencies = []\n",
        ),
        ("users/main.py", "def main():\n    pass\n"),
    ]);

    // The manifest-created service owns the top dir; no auto twin.
    let services = store
        .find_nodes(&token, &NodeFilter::by_type(NodeType::Service))
        .unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "users-api");
    assert_eq!(services[0].properties["kind"], "service");

    // Files still hang off the manifest service.
    let contained = store
        .neighbors(&token, &services[0].id, EdgeType::Contains, EdgeDirection::Outgoing)
        .unwrap();
    assert!(contained.iter().any(|n| n.file_path == "users/main.py"));
}
