use carta_core::id::{edge_id, node_id};
use carta_core::{Edge, EdgeType, Node, NodeType};
use sha2::{Digest, Sha256};

fn sha_prefix12(input: &str) -> String {
    hex::encode(&Sha256::digest(input.as_bytes())[..12])
}

#[test]
fn test_node_id_formula() {
    let id = node_id(NodeType::Function, "pkg/graph/graph.go", "AddNode");
    assert_eq!(id, sha_prefix12("function:pkg/graph/graph.go:AddNode"));
}

#[test]
fn test_edge_id_formula() {
    let source = node_id(NodeType::Function, "a.go", "caller");
    let target = node_id(NodeType::Function, "a.go", "callee");
    let id = edge_id(EdgeType::Calls, &source, &target);
    assert_eq!(id, sha_prefix12(&format!("calls:{source}:{target}")));
}

#[test]
fn test_node_constructor_uses_formula() {
    let node = Node::new(NodeType::ApiEndpoint, "GET /users", "api/routes.go");
    assert_eq!(node.id, sha_prefix12("api_endpoint:api/routes.go:GET /users"));
}

#[test]
fn test_edge_constructor_uses_formula() {
    let edge = Edge::new(EdgeType::DependsOn, "aaa", "bbb");
    assert_eq!(edge.id, sha_prefix12("depends_on:aaa:bbb"));
}
