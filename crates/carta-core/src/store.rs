use crate::cancel::CancelToken;
use crate::types::{Edge, EdgeDirection, EdgeType, GraphError, GraphStats, Node, NodeFilter};

/// The persistence contract consumed by extractors and the linker.
///
/// Every operation takes an explicit cancellation token and returns
/// [`GraphError::Cancelled`] once the token has tripped. Implementations
/// must be shareable across threads: the driver may index files in
/// parallel while the store mediates concurrent writes.
///
/// Duplicate edge inserts are not fatal: `add_edge` silently absorbs an
/// edge whose id is already present and reports whether a row was
/// actually added. Edge ids are deterministic, so this is the canonical
/// idempotence point for the linker phases.
pub trait GraphStore: Send + Sync {
    /// Insert a node, replacing any previous node with the same id.
    fn add_node(&self, token: &CancelToken, node: &Node) -> Result<(), GraphError>;

    /// Update an existing node, keyed by id.
    fn update_node(&self, token: &CancelToken, node: &Node) -> Result<(), GraphError>;

    /// Delete a node and every edge touching it.
    fn delete_node(&self, token: &CancelToken, id: &str) -> Result<(), GraphError>;

    /// Look up a node by id.
    fn get_node(&self, token: &CancelToken, id: &str) -> Result<Option<Node>, GraphError>;

    /// Query nodes by filter. The empty filter returns all nodes.
    fn find_nodes(&self, token: &CancelToken, filter: &NodeFilter)
        -> Result<Vec<Node>, GraphError>;

    /// Insert an edge. Returns `true` when the edge was newly inserted,
    /// `false` when an edge with the same id already existed.
    fn add_edge(&self, token: &CancelToken, edge: &Edge) -> Result<bool, GraphError>;

    /// Delete an edge by id.
    fn delete_edge(&self, token: &CancelToken, id: &str) -> Result<(), GraphError>;

    /// Edges touching `node_id`, optionally restricted to one edge type.
    fn edges_for(
        &self,
        token: &CancelToken,
        node_id: &str,
        edge_type: Option<EdgeType>,
    ) -> Result<Vec<Edge>, GraphError>;

    /// Nodes reachable from `node_id` over `edge_type` in `direction`.
    fn neighbors(
        &self,
        token: &CancelToken,
        node_id: &str,
        edge_type: EdgeType,
        direction: EdgeDirection,
    ) -> Result<Vec<Node>, GraphError>;

    /// Delete all nodes whose `file_path` matches, and all edges touching
    /// them, atomically. Re-indexing a file is delete-then-reinsert, so
    /// this is the file-level transaction boundary.
    fn delete_by_file(&self, token: &CancelToken, file_path: &str) -> Result<(), GraphError>;

    /// Aggregate counts over the stored graph.
    fn stats(&self, token: &CancelToken) -> Result<GraphStats, GraphError>;

    /// Flush and release underlying resources.
    fn close(&self) -> Result<(), GraphError>;
}
