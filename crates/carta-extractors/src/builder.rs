//! Incremental builder for a file's [`ParseResult`].
//!
//! Extractors accumulate nodes and edges here; only the finished
//! collection is handed to the store. The builder owns the file and
//! package roots, containment edges, and the Function→TestFunction
//! reclassification inside test-named files.

use std::collections::HashSet;

use carta_core::{Edge, EdgeType, Language, Node, NodeType};

use crate::extractor::ParseResult;
use crate::strings::basename;
use crate::testkind;

pub struct GraphBuilder {
    file_path: String,
    language: Language,
    test_file: bool,
    file_id: String,
    package_id: String,
    package_name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    seen_nodes: HashSet<String>,
    seen_edges: HashSet<String>,
}

impl GraphBuilder {
    /// Creates the builder and its root File (or TestFile) node.
    pub fn new(file_path: &str, language: Language) -> Self {
        let test_file = testkind::is_test_file(language, file_path);
        let node_type = if test_file {
            NodeType::TestFile
        } else {
            NodeType::File
        };
        let mut file = Node::new(node_type, basename(file_path), file_path);
        file.qualified_name = file_path.to_string();
        file.language = language.as_str().to_string();
        file.line_start = 1;
        let file_id = file.id.clone();

        let mut builder = GraphBuilder {
            file_path: file_path.to_string(),
            language,
            test_file,
            file_id,
            package_id: String::new(),
            package_name: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            seen_nodes: HashSet::new(),
            seen_edges: HashSet::new(),
        };
        builder.push_node(file);
        builder
    }

    pub fn is_test_file(&self) -> bool {
        self.test_file
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Record the file's final line.
    pub fn set_file_end(&mut self, line_end: u32) {
        if let Some(file) = self.nodes.first_mut() {
            file.line_end = line_end;
        }
    }

    /// Emit the Package node (module-equivalent) and File→Package
    /// containment. Subsequent declarations attach beneath it.
    pub fn package(&mut self, name: &str) -> String {
        let mut pkg = Node::new(NodeType::Package, name, &self.file_path);
        pkg.qualified_name = name.to_string();
        pkg.language = self.language.as_str().to_string();
        pkg.exported = true;
        let id = pkg.id.clone();
        self.push_node(pkg);
        let file_id = self.file_id.clone();
        self.edge(Edge::new(EdgeType::Contains, &file_id, &id));
        self.package_id = id.clone();
        self.package_name = name.to_string();
        id
    }

    /// Emit a top-level declaration node plus Package→declaration
    /// containment. Functions in test files that match the language's
    /// test-function convention become TestFunction nodes.
    #[allow(clippy::too_many_arguments)]
    pub fn declaration(
        &mut self,
        node_type: NodeType,
        name: &str,
        line_start: u32,
        line_end: u32,
        exported: bool,
        signature: &str,
        doc_comment: &str,
    ) -> String {
        let node_type = if (node_type == NodeType::Function || node_type == NodeType::Method)
            && self.test_file
            && testkind::is_test_function(self.language, name)
        {
            NodeType::TestFunction
        } else {
            node_type
        };
        let mut node = Node::new(node_type, name, &self.file_path);
        node.qualified_name = self.qualify(name);
        node.package = self.package_name.clone();
        node.language = self.language.as_str().to_string();
        node.line_start = line_start;
        node.line_end = line_end;
        node.exported = exported;
        node.signature = signature.to_string();
        node.doc_comment = doc_comment.to_string();
        let id = node.id.clone();
        self.push_node(node);
        let container = self.container_id();
        self.edge(Edge::new(EdgeType::Contains, &container, &id));
        id
    }

    /// Emit an import Dependency node (raw imported path as the name)
    /// and the Package→Dependency Imports edge.
    pub fn import_dep(&mut self, raw: &str, line: u32) -> String {
        let mut dep = Node::new(NodeType::Dependency, raw, &self.file_path);
        dep.qualified_name = raw.to_string();
        dep.package = self.package_name.clone();
        dep.language = self.language.as_str().to_string();
        dep.line_start = line;
        dep.line_end = line;
        dep.properties.insert("kind".to_string(), "import".to_string());
        let id = dep.id.clone();
        self.push_node(dep);
        let container = self.container_id();
        self.edge(Edge::new(EdgeType::Imports, &container, &id));
        id
    }

    /// Emit an outbound HTTP-call Dependency node and the Calls edge from
    /// the enclosing function or method.
    pub fn api_call(
        &mut self,
        from_id: &str,
        http_method: &str,
        path: &str,
        framework: &str,
        line: u32,
    ) -> String {
        let name = format!("{http_method} {path}");
        let mut dep = Node::new(NodeType::Dependency, &name, &self.file_path);
        dep.qualified_name = name.clone();
        dep.package = self.package_name.clone();
        dep.language = self.language.as_str().to_string();
        dep.line_start = line;
        dep.line_end = line;
        dep.properties
            .insert("kind".to_string(), "api_call".to_string());
        dep.properties
            .insert("http_method".to_string(), http_method.to_string());
        dep.properties.insert("path".to_string(), path.to_string());
        dep.properties
            .insert("framework".to_string(), framework.to_string());
        let id = dep.id.clone();
        self.push_node(dep);
        self.edge(Edge::new(EdgeType::Calls, from_id, &id));
        id
    }

    /// Emit a server-side APIEndpoint node and the Exposes edge from the
    /// handler's enclosing function or method.
    pub fn endpoint(
        &mut self,
        from_id: &str,
        http_method: &str,
        path: &str,
        framework: &str,
        handler: &str,
        line: u32,
    ) -> String {
        let name = format!("{http_method} {path}");
        let mut ep = Node::new(NodeType::ApiEndpoint, &name, &self.file_path);
        ep.qualified_name = name.clone();
        ep.package = self.package_name.clone();
        ep.language = self.language.as_str().to_string();
        ep.line_start = line;
        ep.line_end = line;
        ep.exported = true;
        ep.properties
            .insert("http_method".to_string(), http_method.to_string());
        ep.properties.insert("path".to_string(), path.to_string());
        ep.properties
            .insert("framework".to_string(), framework.to_string());
        ep.properties
            .insert("handler".to_string(), handler.to_string());
        let id = ep.id.clone();
        self.push_node(ep);
        self.edge(Edge::new(EdgeType::Exposes, from_id, &id));
        id
    }

    /// Emit a router-mount Variable node (`kind = "router_mount"`),
    /// consumed by the linker's endpoint phase. A plain Variable already
    /// emitted for the same binding is upgraded in place.
    pub fn router_mount(&mut self, name: &str, prefix: &str, line: u32) -> String {
        let existing = Node::new(NodeType::Variable, name, &self.file_path);
        if self.seen_nodes.contains(&existing.id) {
            let id = existing.id;
            self.set_prop(&id, "kind", "router_mount");
            self.set_prop(&id, "prefix", prefix);
            return id;
        }
        let mut mount = Node::new(NodeType::Variable, name, &self.file_path);
        mount.qualified_name = self.qualify(name);
        mount.package = self.package_name.clone();
        mount.language = self.language.as_str().to_string();
        mount.line_start = line;
        mount.line_end = line;
        mount
            .properties
            .insert("kind".to_string(), "router_mount".to_string());
        mount
            .properties
            .insert("prefix".to_string(), prefix.to_string());
        let id = mount.id.clone();
        self.push_node(mount);
        let container = self.container_id();
        self.edge(Edge::new(EdgeType::Contains, &container, &id));
        id
    }

    /// Emit an intra-file Calls edge; `callee` records the qualified
    /// callee for dependency targets.
    pub fn calls(&mut self, source_id: &str, target_id: &str, callee: Option<&str>) {
        let mut edge = Edge::new(EdgeType::Calls, source_id, target_id);
        if let Some(callee) = callee {
            edge.properties
                .insert("callee".to_string(), callee.to_string());
        }
        self.edge(edge);
    }

    /// Set a property on an already-emitted node.
    pub fn set_prop(&mut self, id: &str, key: &str, value: &str) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.properties.insert(key.to_string(), value.to_string());
        }
    }

    /// Look up an emitted node's type by id.
    pub fn node_type(&self, id: &str) -> Option<NodeType> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.node_type)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.seen_nodes.contains(id)
    }

    pub fn push_node(&mut self, node: Node) {
        if self.seen_nodes.insert(node.id.clone()) {
            self.nodes.push(node);
        }
    }

    pub fn edge(&mut self, edge: Edge) {
        if self.seen_edges.insert(edge.id.clone()) {
            self.edges.push(edge);
        }
    }

    pub fn finish(self) -> ParseResult {
        ParseResult {
            nodes: self.nodes,
            edges: self.edges,
            file_path: self.file_path,
            language: self.language,
        }
    }

    fn qualify(&self, name: &str) -> String {
        if self.package_name.is_empty() {
            name.to_string()
        } else if self.language == Language::Rust {
            format!("{}::{}", self.package_name, name)
        } else {
            format!("{}.{}", self.package_name, name)
        }
    }

    fn container_id(&self) -> String {
        if self.package_id.is_empty() {
            self.file_id.clone()
        } else {
            self.package_id.clone()
        }
    }
}
