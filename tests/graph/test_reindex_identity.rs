use carta_core::export::export_graph;
use carta_core::sqlite::SqliteStore;
use carta_core::{CancelToken, Edge, Node};

use crate::common::index_into;

const SOURCE: &str = r#"package graph

import "fmt"

type Store interface {
	AddNode(id string) error
}

type MemStore struct {
	count int
}

func (m *MemStore) AddNode(id string) error {
	fmt.Println(id)
	return nil
}
"#;

fn sorted_snapshot(store: &SqliteStore, token: &CancelToken) -> (Vec<Node>, Vec<Edge>) {
    let mut export = export_graph(store, token).unwrap();
    export.nodes.sort_by(|a, b| a.id.cmp(&b.id));
    export.edges.sort_by(|a, b| a.id.cmp(&b.id));
    (export.nodes, export.edges)
}

#[test]
fn test_reindexing_unchanged_file_reproduces_graph() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    index_into(&store, &token, &[("pkg/graph/graph.go", SOURCE)]);
    let first = sorted_snapshot(&store, &token);

    index_into(&store, &token, &[("pkg/graph/graph.go", SOURCE)]);
    let second = sorted_snapshot(&store, &token);

    assert_eq!(first, second, "re-index must reproduce identical entities");
}
