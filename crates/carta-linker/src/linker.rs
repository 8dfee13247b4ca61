//! Phase orchestration for the cross-file linker.

use std::collections::HashMap;

use carta_core::{
    CancelToken, Edge, GraphError, GraphStore, Language, Node, NodeFilter, NodeType,
};

use crate::phases;

/// Cross-file linking over an already-indexed store. Phases run in a
/// fixed order; each reads current graph state and appends edges (and
/// occasionally nodes) idempotently.
pub struct Linker<'a> {
    store: &'a dyn GraphStore,
    token: &'a CancelToken,
    verbose: bool,
}

/// Edges appended per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub services: usize,
    pub endpoints: usize,
    pub api_calls: usize,
    pub library_deps: usize,
    pub import_deps: usize,
    pub implements: usize,
    pub test_links: usize,
}

impl LinkReport {
    pub fn total(&self) -> usize {
        self.services
            + self.endpoints
            + self.api_calls
            + self.library_deps
            + self.import_deps
            + self.implements
            + self.test_links
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("linker phase {phase} failed: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: GraphError,
    },
}

impl<'a> Linker<'a> {
    pub fn new(store: &'a dyn GraphStore, token: &'a CancelToken) -> Self {
        Linker {
            store,
            token,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run all seven phases in order. Endpoint `full_path` rewriting
    /// happens before API-call matching; services exist before endpoints
    /// attach to them; implements runs once all declarations are present.
    pub fn run_all(&self) -> Result<LinkReport, LinkError> {
        let ctx = LinkContext {
            store: self.store,
            token: self.token,
            verbose: self.verbose,
        };
        let mut report = LinkReport::default();
        report.services = run_phase("services", || phases::services::run(&ctx))?;
        report.endpoints = run_phase("endpoints", || phases::endpoints::run(&ctx))?;
        report.api_calls = run_phase("api_calls", || phases::api_calls::run(&ctx))?;
        report.library_deps = run_phase("library_deps", || phases::library_deps::run(&ctx))?;
        report.import_deps = run_phase("import_deps", || phases::import_deps::run(&ctx))?;
        report.implements = run_phase("implements", || phases::implements::run(&ctx))?;
        report.test_links = run_phase("test_links", || phases::test_links::run(&ctx))?;
        tracing::debug!(total = report.total(), "linking complete");
        Ok(report)
    }
}

fn run_phase<F>(name: &'static str, phase: F) -> Result<usize, LinkError>
where
    F: FnOnce() -> Result<usize, GraphError>,
{
    let added = phase().map_err(|source| LinkError::Phase {
        phase: name,
        source,
    })?;
    tracing::debug!(phase = name, added, "linker phase finished");
    Ok(added)
}

/// Shared state handed to each phase.
pub(crate) struct LinkContext<'a> {
    pub store: &'a dyn GraphStore,
    pub token: &'a CancelToken,
    pub verbose: bool,
}

impl LinkContext<'_> {
    /// Insert an edge, tolerating single-edge failures (logged), and
    /// report whether a new edge was appended. Cancellation aborts.
    pub fn add_edge(&self, edge: &Edge) -> Result<bool, GraphError> {
        match self.store.add_edge(self.token, edge) {
            Ok(inserted) => Ok(inserted),
            Err(GraphError::Cancelled) => Err(GraphError::Cancelled),
            Err(e) => {
                tracing::warn!(edge = %edge.id, error = %e, "edge insert failed; continuing");
                Ok(false)
            }
        }
    }

    pub fn nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, GraphError> {
        self.store.find_nodes(self.token, filter)
    }

    pub fn nodes_of(&self, node_type: NodeType) -> Result<Vec<Node>, GraphError> {
        self.nodes(&NodeFilter::by_type(node_type))
    }

    /// Service node per top-level directory: manifest-created services
    /// map through their file's top_dir, auto-detected ones through
    /// their name. Earlier (manifest) entries win.
    pub fn services_by_top_dir(&self) -> Result<HashMap<String, Node>, GraphError> {
        let mut map: HashMap<String, Node> = HashMap::new();
        for service in self.nodes_of(NodeType::Service)? {
            let key = if service.file_path.is_empty() {
                service.name.clone()
            } else {
                top_dir(&service.file_path)
            };
            map.entry(key).or_insert(service);
        }
        Ok(map)
    }
}

/// First path segment of a repo-relative path; `"(root)"` for files at
/// the repository root; `""` for the empty path.
pub fn top_dir(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    match path.split_once('/') {
        Some((first, _)) => first.to_string(),
        None => "(root)".to_string(),
    }
}

/// Language enum from the string stored on a node.
pub(crate) fn node_language(node: &Node) -> Language {
    match node.language.as_str() {
        "go" => Language::Go,
        "python" => Language::Python,
        "typescript" => Language::TypeScript,
        "javascript" => Language::JavaScript,
        "java" => Language::Java,
        "rust" => Language::Rust,
        "csharp" => Language::CSharp,
        _ => Language::Unknown,
    }
}
