use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{edge_id, node_id};

/// Node types in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Repository,
    Service,
    Module,
    Package,
    File,
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Enum,
    Type,
    Constant,
    Variable,
    ApiEndpoint,
    DbModel,
    Migration,
    Dependency,
    Document,
    AiGuideline,
    TestFunction,
    TestFile,
}

impl NodeType {
    /// Returns the lowercase string representation of this node type.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Repository => "repository",
            NodeType::Service => "service",
            NodeType::Module => "module",
            NodeType::Package => "package",
            NodeType::File => "file",
            NodeType::Function => "function",
            NodeType::Method => "method",
            NodeType::Class => "class",
            NodeType::Struct => "struct",
            NodeType::Interface => "interface",
            NodeType::Enum => "enum",
            NodeType::Type => "type",
            NodeType::Constant => "constant",
            NodeType::Variable => "variable",
            NodeType::ApiEndpoint => "api_endpoint",
            NodeType::DbModel => "db_model",
            NodeType::Migration => "migration",
            NodeType::Dependency => "dependency",
            NodeType::Document => "document",
            NodeType::AiGuideline => "ai_guideline",
            NodeType::TestFunction => "test_function",
            NodeType::TestFile => "test_file",
        }
    }

    /// Parses the lowercase string form produced by [`NodeType::as_str`].
    pub fn parse(s: &str) -> Option<NodeType> {
        Some(match s {
            "repository" => NodeType::Repository,
            "service" => NodeType::Service,
            "module" => NodeType::Module,
            "package" => NodeType::Package,
            "file" => NodeType::File,
            "function" => NodeType::Function,
            "method" => NodeType::Method,
            "class" => NodeType::Class,
            "struct" => NodeType::Struct,
            "interface" => NodeType::Interface,
            "enum" => NodeType::Enum,
            "type" => NodeType::Type,
            "constant" => NodeType::Constant,
            "variable" => NodeType::Variable,
            "api_endpoint" => NodeType::ApiEndpoint,
            "db_model" => NodeType::DbModel,
            "migration" => NodeType::Migration,
            "dependency" => NodeType::Dependency,
            "document" => NodeType::Document,
            "ai_guideline" => NodeType::AiGuideline,
            "test_function" => NodeType::TestFunction,
            "test_file" => NodeType::TestFile,
            _ => return None,
        })
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge types between graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Contains,
    Imports,
    DependsOn,
    Calls,
    Implements,
    Exposes,
    Consumes,
    Documents,
    Tests,
    Migrates,
    Configures,
}

impl EdgeType {
    /// Returns the lowercase string representation of this edge type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Contains => "contains",
            EdgeType::Imports => "imports",
            EdgeType::DependsOn => "depends_on",
            EdgeType::Calls => "calls",
            EdgeType::Implements => "implements",
            EdgeType::Exposes => "exposes",
            EdgeType::Consumes => "consumes",
            EdgeType::Documents => "documents",
            EdgeType::Tests => "tests",
            EdgeType::Migrates => "migrates",
            EdgeType::Configures => "configures",
        }
    }

    /// Parses the lowercase string form produced by [`EdgeType::as_str`].
    pub fn parse(s: &str) -> Option<EdgeType> {
        Some(match s {
            "contains" => EdgeType::Contains,
            "imports" => EdgeType::Imports,
            "depends_on" => EdgeType::DependsOn,
            "calls" => EdgeType::Calls,
            "implements" => EdgeType::Implements,
            "exposes" => EdgeType::Exposes,
            "consumes" => EdgeType::Consumes,
            "documents" => EdgeType::Documents,
            "tests" => EdgeType::Tests,
            "migrates" => EdgeType::Migrates,
            "configures" => EdgeType::Configures,
            _ => return None,
        })
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source languages recognized by the extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Go,
    Python,
    TypeScript,
    JavaScript,
    Java,
    Rust,
    CSharp,
    Unknown,
}

impl Language {
    /// Returns the lowercase language name; empty for [`Language::Unknown`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::Rust => "rust",
            Language::CSharp => "csharp",
            Language::Unknown => "",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code entity in the knowledge graph.
///
/// Absent or unknown values are empty strings / zero lines, never sentinels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub node_type: NodeType,
    pub name: String,
    pub qualified_name: String,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    pub package: String,
    pub language: String,
    pub exported: bool,
    pub signature: String,
    pub doc_comment: String,
    pub properties: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
}

impl Node {
    /// Creates a node with its deterministic id computed from
    /// `(node_type, file_path, name)`; all other fields start empty.
    pub fn new(node_type: NodeType, name: &str, file_path: &str) -> Self {
        Node {
            id: node_id(node_type, file_path, name),
            node_type,
            name: name.to_string(),
            qualified_name: String::new(),
            file_path: file_path.to_string(),
            line_start: 0,
            line_end: 0,
            package: String::new(),
            language: String::new(),
            exported: false,
            signature: String::new(),
            doc_comment: String::new(),
            properties: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Convenience property lookup returning `""` when absent.
    pub fn prop(&self, key: &str) -> &str {
        self.properties.get(key).map(String::as_str).unwrap_or("")
    }
}

/// A directed relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub edge_type: EdgeType,
    pub source_id: String,
    pub target_id: String,
    pub properties: BTreeMap<String, String>,
}

impl Edge {
    /// Creates an edge with its deterministic id computed from
    /// `(edge_type, source_id, target_id)`.
    pub fn new(edge_type: EdgeType, source_id: &str, target_id: &str) -> Self {
        Edge {
            id: edge_id(edge_type, source_id, target_id),
            edge_type,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            properties: BTreeMap::new(),
        }
    }

    /// Returns the edge with an extra property set.
    pub fn with_prop(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }
}

/// Direction for edge traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Incoming,
    Outgoing,
    Both,
}

/// Query filter over nodes. All set fields are AND-combined; the empty
/// filter matches every node.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub node_type: Option<NodeType>,
    pub file_path: Option<String>,
    pub package: Option<String>,
    pub language: Option<String>,
    /// Glob pattern matched against the display name.
    pub name_pattern: Option<String>,
    pub exported: Option<bool>,
    /// Exact-match property constraints.
    pub properties: BTreeMap<String, String>,
}

impl NodeFilter {
    pub fn by_type(node_type: NodeType) -> Self {
        NodeFilter {
            node_type: Some(node_type),
            ..Default::default()
        }
    }

    pub fn by_file(file_path: &str) -> Self {
        NodeFilter {
            file_path: Some(file_path.to_string()),
            ..Default::default()
        }
    }

    /// Returns the filter with an extra exact property constraint.
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    /// Whether `node` satisfies every set constraint.
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(t) = self.node_type {
            if node.node_type != t {
                return false;
            }
        }
        if let Some(ref p) = self.file_path {
            if &node.file_path != p {
                return false;
            }
        }
        if let Some(ref p) = self.package {
            if &node.package != p {
                return false;
            }
        }
        if let Some(ref l) = self.language {
            if &node.language != l {
                return false;
            }
        }
        if let Some(e) = self.exported {
            if node.exported != e {
                return false;
            }
        }
        if let Some(ref pattern) = self.name_pattern {
            match globset::Glob::new(pattern) {
                Ok(glob) => {
                    if !glob.compile_matcher().is_match(&node.name) {
                        return false;
                    }
                }
                Err(_) => return false,
            }
        }
        for (k, v) in &self.properties {
            if node.properties.get(k) != Some(v) {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts over the stored graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: u64,
    pub edge_count: u64,
    pub nodes_by_type: BTreeMap<String, u64>,
    pub edges_by_type: BTreeMap<String, u64>,
    pub nodes_by_language: BTreeMap<String, u64>,
}

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for GraphError {
    fn from(e: rusqlite::Error) -> Self {
        GraphError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Serialization(e.to_string())
    }
}
