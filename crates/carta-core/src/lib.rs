//! Core types and graph storage for carta.
//!
//! This crate provides the foundational data structures used across all
//! carta crates:
//! - [`types`] — Graph nodes, edges, filters, stats, and error types
//! - [`id`] — Deterministic SHA-256 prefix ids for nodes and edges
//! - [`cancel`] — The cancellation token threaded through store operations
//! - [`store`] — The [`GraphStore`](store::GraphStore) persistence contract
//! - [`sqlite`] — SQLite-backed implementation of `GraphStore`
//! - [`export`] — Full-graph JSON export/import

pub mod cancel;
pub mod export;
pub mod id;
pub mod sqlite;
pub mod store;
pub mod types;

pub use cancel::CancelToken;
pub use store::GraphStore;
pub use types::{
    Edge, EdgeDirection, EdgeType, GraphError, GraphStats, Language, Node, NodeFilter, NodeType,
};
