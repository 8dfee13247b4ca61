use carta_core::{Edge, Language, Node};

/// Complete extraction output for a single source file.
///
/// The result is transient: nodes and edges exist only once the driver
/// hands them to the store. All nodes precede all edges so the store's
/// ordering guarantee (nodes before edges referencing them) holds.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub file_path: String,
    pub language: Language,
}

/// The core abstraction every language-specific extractor must implement.
///
/// Each extractor is responsible for turning one file's AST into graph
/// entities and intra-file edges. Implementors must be `Send + Sync` so
/// they can be shared across rayon parallel iterators.
pub trait Extractor: Send + Sync {
    /// Returns the language this extractor handles.
    fn language(&self) -> Language;

    /// File extensions (without dot) this extractor claims.
    fn extensions(&self) -> &'static [&'static str];

    /// Parse a single file into nodes and intra-file edges.
    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError>;
}

/// Errors produced during extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid utf-8 in {0}")]
    Utf8(String),

    #[error("manifest error in {path}: {message}")]
    Manifest { path: String, message: String },
}
