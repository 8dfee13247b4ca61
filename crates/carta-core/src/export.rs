use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::store::GraphStore;
use crate::types::{Edge, GraphError, Node, NodeFilter};

/// Full-graph serialization: the complete node list followed by the
/// complete edge list. Round-tripping through export/import reproduces
/// the graph byte-equivalently modulo ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Snapshot the entire graph.
pub fn export_graph(
    store: &dyn GraphStore,
    token: &CancelToken,
) -> Result<GraphExport, GraphError> {
    let nodes = store.find_nodes(token, &NodeFilter::default())?;
    let mut edges = Vec::new();
    for node in &nodes {
        for edge in store.edges_for(token, &node.id, None)? {
            // Outgoing only, so each edge is collected exactly once.
            if edge.source_id == node.id {
                edges.push(edge);
            }
        }
    }
    // Dangling edges (source node already deleted) are unreachable via any
    // node and intentionally not exported; the linker never creates them.
    Ok(GraphExport { nodes, edges })
}

/// Replace the store's contents with the exported graph.
pub fn import_graph(
    store: &dyn GraphStore,
    token: &CancelToken,
    export: &GraphExport,
) -> Result<(), GraphError> {
    for node in store.find_nodes(token, &NodeFilter::default())? {
        store.delete_node(token, &node.id)?;
    }
    for node in &export.nodes {
        store.add_node(token, node)?;
    }
    for edge in &export.edges {
        store.add_edge(token, edge)?;
    }
    Ok(())
}

/// Serialize an export to pretty JSON.
pub fn to_json(export: &GraphExport) -> Result<String, GraphError> {
    Ok(serde_json::to_string_pretty(export)?)
}

/// Parse an export from JSON.
pub fn from_json(json: &str) -> Result<GraphExport, GraphError> {
    Ok(serde_json::from_str(json)?)
}
