use std::sync::Mutex;

use rusqlite::{params, Connection, Result as SqlResult};

use crate::cancel::CancelToken;
use crate::store::GraphStore;
use crate::types::{
    Edge, EdgeDirection, EdgeType, GraphError, GraphStats, Node, NodeFilter, NodeType,
};

const SCHEMA_VERSION: u32 = 1;

/// SQLite-backed implementation of the [`GraphStore`] trait.
///
/// Nodes and edges are freestanding records keyed by their deterministic
/// string ids; `properties` and `metrics` maps are stored as JSON text.
/// The connection sits behind a mutex so the store can mediate writes
/// from parallel indexing workers.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open or create a graph database at the given path.
    pub fn open(path: &str) -> Result<Self, GraphError> {
        let conn = Connection::open(path)?;
        let store = SqliteStore {
            conn: Mutex::new(Some(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory graph database (for testing).
    pub fn in_memory() -> Result<Self, GraphError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore {
            conn: Mutex::new(Some(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), GraphError> {
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        conn.execute_batch(
            "
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS carta_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Nodes
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                name TEXT NOT NULL,
                qualified_name TEXT NOT NULL DEFAULT '',
                file_path TEXT NOT NULL DEFAULT '',
                line_start INTEGER NOT NULL DEFAULT 0,
                line_end INTEGER NOT NULL DEFAULT 0,
                package TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT '',
                exported INTEGER NOT NULL DEFAULT 0,
                signature TEXT NOT NULL DEFAULT '',
                doc_comment TEXT NOT NULL DEFAULT '',
                properties TEXT NOT NULL DEFAULT '{}',
                metrics TEXT NOT NULL DEFAULT '{}'
            );
            CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(type);
            CREATE INDEX IF NOT EXISTS idx_nodes_file ON nodes(file_path);
            CREATE INDEX IF NOT EXISTS idx_nodes_package ON nodes(package);

            -- Edges
            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                properties TEXT NOT NULL DEFAULT '{}'
            );
            CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
            CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type);
            ",
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO carta_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;

        Ok(())
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<u32, GraphError> {
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        let version: String = conn.query_row(
            "SELECT value FROM carta_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        version
            .parse()
            .map_err(|e| GraphError::Internal(format!("invalid schema version: {e}")))
    }

    fn live<'a>(
        guard: &'a std::sync::MutexGuard<'_, Option<Connection>>,
    ) -> Result<&'a Connection, GraphError> {
        guard
            .as_ref()
            .ok_or_else(|| GraphError::Database("store is closed".to_string()))
    }

    fn row_to_node(row: &rusqlite::Row) -> SqlResult<Node> {
        let type_str: String = row.get("type")?;
        let properties_json: String = row.get("properties")?;
        let metrics_json: String = row.get("metrics")?;
        Ok(Node {
            id: row.get("id")?,
            // Unknown kinds cannot appear through this crate's API; fallback
            // keeps imports of hand-edited databases from aborting a scan.
            node_type: NodeType::parse(&type_str).unwrap_or(NodeType::File),
            name: row.get("name")?,
            qualified_name: row.get("qualified_name")?,
            file_path: row.get("file_path")?,
            line_start: row.get("line_start")?,
            line_end: row.get("line_end")?,
            package: row.get("package")?,
            language: row.get("language")?,
            exported: row.get::<_, i32>("exported")? != 0,
            signature: row.get("signature")?,
            doc_comment: row.get("doc_comment")?,
            properties: serde_json::from_str(&properties_json).unwrap_or_default(),
            metrics: serde_json::from_str(&metrics_json).unwrap_or_default(),
        })
    }

    fn row_to_edge(row: &rusqlite::Row) -> SqlResult<Edge> {
        let type_str: String = row.get("type")?;
        let properties_json: String = row.get("properties")?;
        Ok(Edge {
            id: row.get("id")?,
            edge_type: EdgeType::parse(&type_str).unwrap_or(EdgeType::Contains),
            source_id: row.get("source_id")?,
            target_id: row.get("target_id")?,
            properties: serde_json::from_str(&properties_json).unwrap_or_default(),
        })
    }

    fn node_params(node: &Node) -> Result<(String, String), GraphError> {
        let properties = serde_json::to_string(&node.properties)?;
        let metrics = serde_json::to_string(&node.metrics)?;
        Ok((properties, metrics))
    }
}

impl GraphStore for SqliteStore {
    fn add_node(&self, token: &CancelToken, node: &Node) -> Result<(), GraphError> {
        token.check()?;
        let (properties, metrics) = Self::node_params(node)?;
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        conn.execute(
            "INSERT OR REPLACE INTO nodes
             (id, type, name, qualified_name, file_path, line_start, line_end,
              package, language, exported, signature, doc_comment, properties, metrics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                node.id,
                node.node_type.as_str(),
                node.name,
                node.qualified_name,
                node.file_path,
                node.line_start,
                node.line_end,
                node.package,
                node.language,
                node.exported as i32,
                node.signature,
                node.doc_comment,
                properties,
                metrics,
            ],
        )?;
        Ok(())
    }

    fn update_node(&self, token: &CancelToken, node: &Node) -> Result<(), GraphError> {
        token.check()?;
        let (properties, metrics) = Self::node_params(node)?;
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        let changed = conn.execute(
            "UPDATE nodes SET type = ?1, name = ?2, qualified_name = ?3, file_path = ?4,
             line_start = ?5, line_end = ?6, package = ?7, language = ?8, exported = ?9,
             signature = ?10, doc_comment = ?11, properties = ?12, metrics = ?13
             WHERE id = ?14",
            params![
                node.node_type.as_str(),
                node.name,
                node.qualified_name,
                node.file_path,
                node.line_start,
                node.line_end,
                node.package,
                node.language,
                node.exported as i32,
                node.signature,
                node.doc_comment,
                properties,
                metrics,
                node.id,
            ],
        )?;
        if changed == 0 {
            return Err(GraphError::NodeNotFound(node.id.clone()));
        }
        Ok(())
    }

    fn delete_node(&self, token: &CancelToken, id: &str) -> Result<(), GraphError> {
        token.check()?;
        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| GraphError::Database("store is closed".to_string()))?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    fn get_node(&self, token: &CancelToken, id: &str) -> Result<Option<Node>, GraphError> {
        token.check()?;
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        let mut stmt = conn.prepare("SELECT * FROM nodes WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], Self::row_to_node)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn find_nodes(
        &self,
        token: &CancelToken,
        filter: &NodeFilter,
    ) -> Result<Vec<Node>, GraphError> {
        token.check()?;
        // Exact constraints are pushed into SQL; glob and property
        // predicates are finished in Rust via NodeFilter::matches.
        let mut sql = String::from("SELECT * FROM nodes WHERE 1=1");
        let mut args: Vec<String> = Vec::new();
        if let Some(t) = filter.node_type {
            args.push(t.as_str().to_string());
            sql.push_str(&format!(" AND type = ?{}", args.len()));
        }
        if let Some(ref p) = filter.file_path {
            args.push(p.clone());
            sql.push_str(&format!(" AND file_path = ?{}", args.len()));
        }
        if let Some(ref p) = filter.package {
            args.push(p.clone());
            sql.push_str(&format!(" AND package = ?{}", args.len()));
        }
        if let Some(ref l) = filter.language {
            args.push(l.clone());
            sql.push_str(&format!(" AND language = ?{}", args.len()));
        }
        if let Some(e) = filter.exported {
            sql.push_str(if e { " AND exported = 1" } else { " AND exported = 0" });
        }
        sql.push_str(" ORDER BY file_path, line_start, name");

        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), Self::row_to_node)?;
        let mut nodes = Vec::new();
        for row in rows {
            let node = row?;
            if filter.matches(&node) {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn add_edge(&self, token: &CancelToken, edge: &Edge) -> Result<bool, GraphError> {
        token.check()?;
        let properties = serde_json::to_string(&edge.properties)?;
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        // INSERT OR IGNORE: duplicate ids are silently absorbed, and the
        // changed-row count reports whether this edge was new.
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO edges (id, type, source_id, target_id, properties)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                edge.id,
                edge.edge_type.as_str(),
                edge.source_id,
                edge.target_id,
                properties,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn delete_edge(&self, token: &CancelToken, id: &str) -> Result<(), GraphError> {
        token.check()?;
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        conn.execute("DELETE FROM edges WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn edges_for(
        &self,
        token: &CancelToken,
        node_id: &str,
        edge_type: Option<EdgeType>,
    ) -> Result<Vec<Edge>, GraphError> {
        token.check()?;
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        let mut edges = Vec::new();
        match edge_type {
            Some(t) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM edges
                     WHERE (source_id = ?1 OR target_id = ?1) AND type = ?2",
                )?;
                let rows = stmt.query_map(params![node_id, t.as_str()], Self::row_to_edge)?;
                for row in rows {
                    edges.push(row?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare("SELECT * FROM edges WHERE source_id = ?1 OR target_id = ?1")?;
                let rows = stmt.query_map(params![node_id], Self::row_to_edge)?;
                for row in rows {
                    edges.push(row?);
                }
            }
        }
        Ok(edges)
    }

    fn neighbors(
        &self,
        token: &CancelToken,
        node_id: &str,
        edge_type: EdgeType,
        direction: EdgeDirection,
    ) -> Result<Vec<Node>, GraphError> {
        token.check()?;
        let sql = match direction {
            EdgeDirection::Outgoing => {
                "SELECT n.* FROM nodes n JOIN edges e ON n.id = e.target_id
                 WHERE e.source_id = ?1 AND e.type = ?2"
            }
            EdgeDirection::Incoming => {
                "SELECT n.* FROM nodes n JOIN edges e ON n.id = e.source_id
                 WHERE e.target_id = ?1 AND e.type = ?2"
            }
            EdgeDirection::Both => {
                "SELECT n.* FROM nodes n JOIN edges e ON n.id = e.target_id
                 WHERE e.source_id = ?1 AND e.type = ?2
                 UNION
                 SELECT n.* FROM nodes n JOIN edges e ON n.id = e.source_id
                 WHERE e.target_id = ?1 AND e.type = ?2"
            }
        };
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![node_id, edge_type.as_str()], Self::row_to_node)?;
        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row?);
        }
        Ok(nodes)
    }

    fn delete_by_file(&self, token: &CancelToken, file_path: &str) -> Result<(), GraphError> {
        token.check()?;
        let mut guard = self.conn.lock().unwrap();
        let conn = guard
            .as_mut()
            .ok_or_else(|| GraphError::Database("store is closed".to_string()))?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM edges WHERE source_id IN (SELECT id FROM nodes WHERE file_path = ?1)
             OR target_id IN (SELECT id FROM nodes WHERE file_path = ?1)",
            params![file_path],
        )?;
        tx.execute("DELETE FROM nodes WHERE file_path = ?1", params![file_path])?;
        tx.commit()?;
        Ok(())
    }

    fn stats(&self, token: &CancelToken) -> Result<GraphStats, GraphError> {
        token.check()?;
        let guard = self.conn.lock().unwrap();
        let conn = Self::live(&guard)?;
        let mut stats = GraphStats {
            node_count: conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?,
            edge_count: conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?,
            ..Default::default()
        };

        let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM nodes GROUP BY type")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?;
        for row in rows {
            let (t, n) = row?;
            stats.nodes_by_type.insert(t, n);
        }

        let mut stmt = conn.prepare("SELECT type, COUNT(*) FROM edges GROUP BY type")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?;
        for row in rows {
            let (t, n) = row?;
            stats.edges_by_type.insert(t, n);
        }

        let mut stmt = conn.prepare(
            "SELECT language, COUNT(*) FROM nodes WHERE language != '' GROUP BY language",
        )?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, u64>(1)?)))?;
        for row in rows {
            let (l, n) = row?;
            stats.nodes_by_language.insert(l, n);
        }

        Ok(stats)
    }

    fn close(&self) -> Result<(), GraphError> {
        let mut guard = self.conn.lock().unwrap();
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| GraphError::from(e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, EdgeType, Node, NodeType};

    fn test_node(node_type: NodeType, name: &str, file_path: &str) -> Node {
        let mut node = Node::new(node_type, name, file_path);
        node.line_start = 1;
        node.line_end = 10;
        node.language = "go".to_string();
        node.metrics.insert("loc".to_string(), 10.0);
        node
    }

    #[test]
    fn test_add_and_get_node() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let node = test_node(NodeType::Function, "AddNode", "pkg/graph/graph.go");
        store.add_node(&token, &node).unwrap();

        let got = store.get_node(&token, &node.id).unwrap().unwrap();
        assert_eq!(got, node);
    }

    #[test]
    fn test_update_node() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let mut node = test_node(NodeType::ApiEndpoint, "GET /users", "api/routes.go");
        store.add_node(&token, &node).unwrap();

        node.properties
            .insert("full_path".to_string(), "/api/v1/users".to_string());
        store.update_node(&token, &node).unwrap();

        let got = store.get_node(&token, &node.id).unwrap().unwrap();
        assert_eq!(got.prop("full_path"), "/api/v1/users");
    }

    #[test]
    fn test_update_missing_node_errors() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let node = test_node(NodeType::Function, "ghost", "a.go");
        assert!(matches!(
            store.update_node(&token, &node),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_delete_node_cascades_to_edges() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let a = test_node(NodeType::Function, "caller", "a.go");
        let b = test_node(NodeType::Function, "callee", "a.go");
        store.add_node(&token, &a).unwrap();
        store.add_node(&token, &b).unwrap();
        let edge = Edge::new(EdgeType::Calls, &a.id, &b.id);
        assert!(store.add_edge(&token, &edge).unwrap());

        store.delete_node(&token, &b.id).unwrap();
        assert!(store.edges_for(&token, &a.id, None).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_edge_silently_absorbed() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let a = test_node(NodeType::Function, "caller", "a.go");
        let b = test_node(NodeType::Function, "callee", "a.go");
        store.add_node(&token, &a).unwrap();
        store.add_node(&token, &b).unwrap();
        let edge = Edge::new(EdgeType::Calls, &a.id, &b.id);
        assert!(store.add_edge(&token, &edge).unwrap());
        assert!(!store.add_edge(&token, &edge).unwrap());
        assert_eq!(store.edges_for(&token, &a.id, None).unwrap().len(), 1);
    }

    #[test]
    fn test_find_nodes_by_filter() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        store
            .add_node(&token, &test_node(NodeType::Function, "Alpha", "x/a.go"))
            .unwrap();
        store
            .add_node(&token, &test_node(NodeType::Struct, "Beta", "x/a.go"))
            .unwrap();
        store
            .add_node(&token, &test_node(NodeType::Function, "Gamma", "y/b.go"))
            .unwrap();

        let funcs = store
            .find_nodes(&token, &NodeFilter::by_type(NodeType::Function))
            .unwrap();
        assert_eq!(funcs.len(), 2);

        let in_file = store
            .find_nodes(&token, &NodeFilter::by_file("x/a.go"))
            .unwrap();
        assert_eq!(in_file.len(), 2);

        let all = store.find_nodes(&token, &NodeFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_neighbors_directions() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let pkg = test_node(NodeType::Package, "graph", "pkg/graph/graph.go");
        let func = test_node(NodeType::Function, "AddNode", "pkg/graph/graph.go");
        store.add_node(&token, &pkg).unwrap();
        store.add_node(&token, &func).unwrap();
        store
            .add_edge(&token, &Edge::new(EdgeType::Contains, &pkg.id, &func.id))
            .unwrap();

        let out = store
            .neighbors(&token, &pkg.id, EdgeType::Contains, EdgeDirection::Outgoing)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "AddNode");

        let inc = store
            .neighbors(&token, &func.id, EdgeType::Contains, EdgeDirection::Incoming)
            .unwrap();
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].name, "graph");

        let both = store
            .neighbors(&token, &pkg.id, EdgeType::Contains, EdgeDirection::Both)
            .unwrap();
        assert_eq!(both.len(), 1);
    }

    #[test]
    fn test_delete_by_file_removes_exactly_that_file() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let a = test_node(NodeType::Function, "A", "x/a.go");
        let b = test_node(NodeType::Function, "B", "y/b.go");
        store.add_node(&token, &a).unwrap();
        store.add_node(&token, &b).unwrap();
        store
            .add_edge(&token, &Edge::new(EdgeType::Calls, &a.id, &b.id))
            .unwrap();

        store.delete_by_file(&token, "x/a.go").unwrap();
        assert!(store.get_node(&token, &a.id).unwrap().is_none());
        assert!(store.get_node(&token, &b.id).unwrap().is_some());
        // Edges touching the deleted file's nodes are gone too.
        assert!(store.edges_for(&token, &b.id, None).unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_token_aborts_operation() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let node = test_node(NodeType::Function, "f", "a.go");
        assert!(matches!(
            store.add_node(&token, &node),
            Err(GraphError::Cancelled)
        ));
    }

    #[test]
    fn test_stats() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        let a = test_node(NodeType::Function, "A", "x/a.go");
        let b = test_node(NodeType::Struct, "B", "x/a.go");
        store.add_node(&token, &a).unwrap();
        store.add_node(&token, &b).unwrap();
        store
            .add_edge(&token, &Edge::new(EdgeType::Contains, &a.id, &b.id))
            .unwrap();

        let stats = store.stats(&token).unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
        assert_eq!(stats.nodes_by_type.get("function"), Some(&1));
        assert_eq!(stats.nodes_by_language.get("go"), Some(&2));
    }

    #[test]
    fn test_schema_version() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = SqliteStore::in_memory().unwrap();
        let token = CancelToken::new();
        store.close().unwrap();
        let node = test_node(NodeType::Function, "f", "a.go");
        assert!(store.add_node(&token, &node).is_err());
    }
}
