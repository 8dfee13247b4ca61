//! Shared helpers for the integration suites.
#![allow(dead_code)]

use carta_core::sqlite::SqliteStore;
use carta_core::{CancelToken, GraphStore, Node, NodeFilter, NodeType};
use carta_linker::{Indexer, LinkReport, Linker};

/// Index the given files into a fresh in-memory store and run the full
/// linker. Panics on any failure: these are fixtures, not error paths.
pub fn index_and_link(files: &[(&str, &str)]) -> (SqliteStore, CancelToken, LinkReport) {
    let store = SqliteStore::in_memory().expect("in-memory store");
    let token = CancelToken::new();
    index_into(&store, &token, files);
    let report = Linker::new(&store, &token)
        .run_all()
        .expect("linker phases");
    (store, token, report)
}

pub fn index_into(store: &SqliteStore, token: &CancelToken, files: &[(&str, &str)]) {
    let indexer = Indexer::new();
    for (path, content) in files {
        indexer
            .index_file(store, token, path, content.as_bytes())
            .unwrap_or_else(|e| panic!("indexing {path}: {e}"));
    }
}

pub fn find_node(
    store: &SqliteStore,
    token: &CancelToken,
    node_type: NodeType,
    name: &str,
) -> Node {
    store
        .find_nodes(token, &NodeFilter::by_type(node_type))
        .expect("query")
        .into_iter()
        .find(|n| n.name == name)
        .unwrap_or_else(|| panic!("no {node_type:?} named {name}"))
}

pub fn all_edge_count(store: &SqliteStore, token: &CancelToken) -> u64 {
    store.stats(token).expect("stats").edge_count
}
