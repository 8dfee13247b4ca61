use carta_core::sqlite::SqliteStore;
use carta_core::{CancelToken, EdgeType, GraphStore, NodeFilter, NodeType};
use carta_linker::Linker;

use crate::common::index_into;

#[test]
fn test_conflicting_versions_create_no_spurious_edges() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    index_into(
        &store,
        &token,
        &[
            ("svc_a/requirements.txt", "requests==2.28.0\n"),
            ("svc_b/requirements.txt", "requests==2.31.0\n"),
        ],
    );

    // Verbose mode drives the conflict diagnostic path.
    let report = Linker::new(&store, &token).verbose(true).run_all().unwrap();
    assert_eq!(report.library_deps, 0);

    // `requests` is not a service; neither service may depend on the other.
    let services = store
        .find_nodes(&token, &NodeFilter::by_type(NodeType::Service))
        .unwrap();
    assert_eq!(services.len(), 2);
    for service in &services {
        let depends: Vec<_> = store
            .edges_for(&token, &service.id, Some(EdgeType::DependsOn))
            .unwrap()
            .into_iter()
            .filter(|e| e.source_id == service.id && e.properties.get("kind").map(String::as_str) != Some("library_dependency"))
            .collect();
        // Manifest DependsOn edges to the dep nodes themselves remain.
        for edge in depends {
            let target = store.get_node(&token, &edge.target_id).unwrap().unwrap();
            assert_eq!(target.node_type, NodeType::Dependency);
        }
    }
}

#[test]
fn test_matching_dep_name_links_services() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    index_into(
        &store,
        &token,
        &[
            (
                "consumer/pyproject.toml",
                "[project]\nname = \"consumer\"\ndependencies = [\"provider==1.0\"]\n",
            ),
            (
                "provider/pyproject.toml",
                "[project]\nname = \"provider\"\nversion = \"1.0\"\ndependencies = []\n",
            ),
        ],
    );
    let report = Linker::new(&store, &token).run_all().unwrap();
    assert_eq!(report.library_deps, 1);

    let consumer = store
        .find_nodes(&token, &NodeFilter::by_type(NodeType::Service))
        .unwrap()
        .into_iter()
        .find(|s| s.name == "consumer")
        .unwrap();
    let edges = store
        .edges_for(&token, &consumer.id, Some(EdgeType::DependsOn))
        .unwrap();
    assert!(edges.iter().any(|e| {
        e.properties.get("kind").map(String::as_str) == Some("library_dependency")
            && e.properties.get("dep").map(String::as_str) == Some("provider")
            && e.properties.get("version").map(String::as_str) == Some("==1.0")
    }));
}
