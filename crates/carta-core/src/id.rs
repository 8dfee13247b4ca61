use sha2::{Digest, Sha256};

use crate::types::{EdgeType, NodeType};

/// Number of hash bytes kept in an id (24 hex chars).
const ID_BYTES: usize = 12;

fn sha_prefix(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..ID_BYTES])
}

/// Compute the deterministic id for a node.
///
/// id = hex(sha256("<type>:<file_path>:<name>")[..12])
///
/// Re-indexing a file therefore reproduces identical ids, which makes
/// duplicate insertions detectable at the store.
pub fn node_id(node_type: NodeType, file_path: &str, name: &str) -> String {
    sha_prefix(&format!("{}:{}:{}", node_type.as_str(), file_path, name))
}

/// Compute the deterministic id for an edge from its type and endpoint ids.
pub fn edge_id(edge_type: EdgeType, source_id: &str, target_id: &str) -> String {
    sha_prefix(&format!(
        "{}:{}:{}",
        edge_type.as_str(),
        source_id,
        target_id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_deterministic() {
        let a = node_id(NodeType::Function, "pkg/graph/graph.go", "AddNode");
        let b = node_id(NodeType::Function, "pkg/graph/graph.go", "AddNode");
        assert_eq!(a, b);
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_node_id_changes_with_any_component() {
        let base = node_id(NodeType::Function, "a.go", "F");
        assert_ne!(base, node_id(NodeType::Method, "a.go", "F"));
        assert_ne!(base, node_id(NodeType::Function, "b.go", "F"));
        assert_ne!(base, node_id(NodeType::Function, "a.go", "G"));
    }

    #[test]
    fn test_edge_id_deterministic() {
        let a = edge_id(EdgeType::Calls, "aaa", "bbb");
        let b = edge_id(EdgeType::Calls, "aaa", "bbb");
        assert_eq!(a, b);
        assert_ne!(a, edge_id(EdgeType::Calls, "bbb", "aaa"));
        assert_ne!(a, edge_id(EdgeType::Imports, "aaa", "bbb"));
    }
}
