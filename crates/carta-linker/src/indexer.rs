//! Driver glue between the extractor registry and the store: re-index a
//! file (delete-then-reinsert), or fan a batch of files out over rayon.
//! Traversal and change detection stay with the caller.

use carta_core::{CancelToken, GraphError, GraphStore};
use carta_extractors::{ExtractError, ParseResult, Registry};
use rayon::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] GraphError),
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Nodes and edges written.
    Indexed { nodes: usize, edges: usize },
    /// No extractor claims this path.
    Skipped,
}

/// Aggregate result of a batch run. Parse failures are skipped and
/// counted, never fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub parse_errors: usize,
    pub nodes: usize,
    pub edges: usize,
}

pub struct Indexer {
    registry: Registry,
}

impl Indexer {
    pub fn new() -> Self {
        Indexer {
            registry: Registry::with_defaults(),
        }
    }

    pub fn with_registry(registry: Registry) -> Self {
        Indexer { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Index one file: delete the file's previous nodes and edges, then
    /// insert all nodes before any edge referencing them.
    pub fn index_file(
        &self,
        store: &dyn GraphStore,
        token: &CancelToken,
        path: &str,
        content: &[u8],
    ) -> Result<IndexOutcome, IndexError> {
        let Some(extractor) = self.registry.for_path(path) else {
            return Ok(IndexOutcome::Skipped);
        };
        let result = extractor.parse_file(path, content)?;
        let outcome = IndexOutcome::Indexed {
            nodes: result.nodes.len(),
            edges: result.edges.len(),
        };
        self.write(store, token, &result)?;
        Ok(outcome)
    }

    /// Index many files, parsing in parallel; the store mediates the
    /// concurrent writes. Parse errors are logged and skipped.
    pub fn index_files(
        &self,
        store: &dyn GraphStore,
        token: &CancelToken,
        files: &[(String, Vec<u8>)],
    ) -> Result<IndexStats, GraphError> {
        let outcomes: Vec<Result<IndexOutcome, IndexError>> = files
            .par_iter()
            .map(|(path, content)| self.index_file(store, token, path, content))
            .collect();

        let mut stats = IndexStats::default();
        for (outcome, (path, _)) in outcomes.into_iter().zip(files) {
            match outcome {
                Ok(IndexOutcome::Indexed { nodes, edges }) => {
                    stats.files_indexed += 1;
                    stats.nodes += nodes;
                    stats.edges += edges;
                }
                Ok(IndexOutcome::Skipped) => stats.files_skipped += 1,
                Err(IndexError::Store(GraphError::Cancelled)) => {
                    return Err(GraphError::Cancelled);
                }
                Err(IndexError::Extract(e)) => {
                    tracing::warn!(path = %path, error = %e, "parse failed; file skipped");
                    stats.parse_errors += 1;
                }
                Err(IndexError::Store(e)) => {
                    tracing::warn!(path = %path, error = %e, "store write failed; file skipped");
                    stats.parse_errors += 1;
                }
            }
        }
        Ok(stats)
    }

    fn write(
        &self,
        store: &dyn GraphStore,
        token: &CancelToken,
        result: &ParseResult,
    ) -> Result<(), GraphError> {
        store.delete_by_file(token, &result.file_path)?;
        for node in &result.nodes {
            store.add_node(token, node)?;
        }
        for edge in &result.edges {
            store.add_edge(token, edge)?;
        }
        Ok(())
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}
