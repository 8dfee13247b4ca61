use carta_core::{EdgeType, GraphStore, NodeType};

use crate::common::{find_node, index_and_link};

const INTERFACE_FILE: &str = r#"package graph

type Store interface {
	AddNode(id string) error
	GetNode(id string) (string, error)
	Close() error
}
"#;

const STRUCT_FILE: &str = r#"package embedded

type EmbeddedStore struct {
	path string
}

func (s *EmbeddedStore) AddNode(id string) error { return nil }

func (s *EmbeddedStore) GetNode(id string) (string, error) { return "", nil }

func (s *EmbeddedStore) Close() error { return nil }
"#;

#[test]
fn test_go_interface_satisfied_cross_file() {
    let (store, token, _) = index_and_link(&[
        ("pkg/graph/graph.go", INTERFACE_FILE),
        ("internal/embedded/store.go", STRUCT_FILE),
    ]);

    let interface = find_node(&store, &token, NodeType::Interface, "Store");
    let strukt = find_node(&store, &token, NodeType::Struct, "EmbeddedStore");

    let implements = store
        .edges_for(&token, &interface.id, Some(EdgeType::Implements))
        .unwrap();
    assert_eq!(implements.len(), 1, "exactly one Implements edge expected");
    assert_eq!(implements[0].source_id, strukt.id);
    assert_eq!(implements[0].target_id, interface.id);
    assert_eq!(implements[0].properties["kind"], "structural");
}

#[test]
fn test_incomplete_method_set_is_not_an_implementation() {
    let partial = r#"package embedded

type HalfStore struct {
	path string
}

func (s *HalfStore) AddNode(id string) error { return nil }
"#;
    let (store, token, _) = index_and_link(&[
        ("pkg/graph/graph.go", INTERFACE_FILE),
        ("internal/embedded/half.go", partial),
    ]);

    let interface = find_node(&store, &token, NodeType::Interface, "Store");
    assert!(store
        .edges_for(&token, &interface.id, Some(EdgeType::Implements))
        .unwrap()
        .is_empty());
}

#[test]
fn test_embedded_struct_methods_are_promoted() {
    let embedding = r#"package embedded

type Core struct {
	path string
}

func (c *Core) AddNode(id string) error { return nil }

func (c *Core) GetNode(id string) (string, error) { return "", nil }

type WrappedStore struct {
	Core
	extra int
}

func (w *WrappedStore) Close() error { return nil }
"#;
    let (store, token, _) = index_and_link(&[
        ("pkg/graph/graph.go", INTERFACE_FILE),
        ("internal/embedded/wrapped.go", embedding),
    ]);

    let interface = find_node(&store, &token, NodeType::Interface, "Store");
    let wrapped = find_node(&store, &token, NodeType::Struct, "WrappedStore");
    let implements = store
        .edges_for(&token, &interface.id, Some(EdgeType::Implements))
        .unwrap();
    assert!(implements
        .iter()
        .any(|e| e.source_id == wrapped.id && e.properties["kind"] == "structural"));
}
