use carta_core::sqlite::SqliteStore;
use carta_core::{CancelToken, GraphStore, NodeFilter};

use crate::common::index_into;

#[test]
fn test_delete_by_file_removes_exactly_that_files_entities() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    index_into(
        &store,
        &token,
        &[
            ("svc/a.go", "package svc\n\nfunc A() { B() }\n\nfunc B() {}\n"),
            ("svc/b.go", "package other\n\nfunc C() {}\n"),
        ],
    );

    let before_other = store
        .find_nodes(&token, &NodeFilter::by_file("svc/b.go"))
        .unwrap();
    assert!(!before_other.is_empty());

    store.delete_by_file(&token, "svc/a.go").unwrap();

    assert!(store
        .find_nodes(&token, &NodeFilter::by_file("svc/a.go"))
        .unwrap()
        .is_empty());
    let after_other = store
        .find_nodes(&token, &NodeFilter::by_file("svc/b.go"))
        .unwrap();
    assert_eq!(before_other, after_other);

    // No edge may still touch a deleted node.
    for node in &after_other {
        for edge in store.edges_for(&token, &node.id, None).unwrap() {
            let other_end = if edge.source_id == node.id {
                &edge.target_id
            } else {
                &edge.source_id
            };
            assert!(store.get_node(&token, other_end).unwrap().is_some());
        }
    }
}
