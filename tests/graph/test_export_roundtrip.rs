use std::collections::BTreeSet;

use carta_core::export::{export_graph, from_json, import_graph, to_json};
use carta_core::sqlite::SqliteStore;
use carta_core::CancelToken;

use crate::common::index_and_link;

#[test]
fn test_full_pipeline_export_import_roundtrip() {
    let (store, token, _) = index_and_link(&[
        (
            "users/routes.go",
            "package main\n\nfunc routes(r *gin.Engine) {\n\tr.GET(\"/users\", list)\n}\n",
        ),
        ("users/go.mod", "module github.com/acme/users\n"),
        (
            "frontend/client.py",
            "import requests\n\ndef fetch():\n    return requests.get(\"/users\")\n",
        ),
    ]);

    let export = export_graph(&store, &token).unwrap();
    let json = to_json(&export).unwrap();
    let parsed = from_json(&json).unwrap();

    let target = SqliteStore::in_memory().unwrap();
    let target_token = CancelToken::new();
    import_graph(&target, &target_token, &parsed).unwrap();
    let re_export = export_graph(&target, &target_token).unwrap();

    let node_set = |e: &carta_core::export::GraphExport| -> BTreeSet<String> {
        e.nodes
            .iter()
            .map(|n| serde_json::to_string(n).unwrap())
            .collect()
    };
    let edge_set = |e: &carta_core::export::GraphExport| -> BTreeSet<String> {
        e.edges
            .iter()
            .map(|n| serde_json::to_string(n).unwrap())
            .collect()
    };
    assert_eq!(node_set(&export), node_set(&re_export));
    assert_eq!(edge_set(&export), edge_set(&re_export));
}
