use std::collections::BTreeMap;

use carta_core::sqlite::SqliteStore;
use carta_core::{CancelToken, Edge, EdgeType, GraphStore, Node, NodeType};

use crate::client::{ChatClient, OracleError};
use crate::resolver::{resolve, OracleReport};

struct CannedClient {
    response: String,
}

impl ChatClient for CannedClient {
    fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
        Ok(self.response.clone())
    }
}

fn node(node_type: NodeType, name: &str, file_path: &str) -> Node {
    Node::new(node_type, name, file_path)
}

fn with_props(mut n: Node, props: &[(&str, &str)]) -> Node {
    let map: BTreeMap<String, String> = props
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    n.properties = map;
    n
}

fn seed_api_scenario(store: &SqliteStore, token: &CancelToken) -> (Node, Node) {
    let call = with_props(
        node(NodeType::Dependency, "GET /api/v2/widgets", "frontend/client.py"),
        &[
            ("kind", "api_call"),
            ("http_method", "GET"),
            ("path", "/api/v2/widgets"),
            ("framework", "requests"),
        ],
    );
    let endpoint = with_props(
        node(NodeType::ApiEndpoint, "GET /widgets", "backend/routes.py"),
        &[
            ("http_method", "GET"),
            ("path", "/widgets"),
            ("full_path", "/internal/widgets"),
            ("framework", "fastapi"),
        ],
    );
    let frontend = with_props(
        node(NodeType::Service, "frontend", ""),
        &[("kind", "auto_detected")],
    );
    let backend = with_props(
        node(NodeType::Service, "backend", ""),
        &[("kind", "auto_detected")],
    );
    for n in [&call, &endpoint, &frontend, &backend] {
        store.add_node(token, n).unwrap();
    }
    (call, endpoint)
}

#[test]
fn test_high_confidence_match_emits_inferred_edges() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    let (call, endpoint) = seed_api_scenario(&store, &token);

    let client = CannedClient {
        response: r#"The best match:
[{"endpoint_path": "/internal/widgets", "confidence": "high", "reason": "same resource"}]"#
            .to_string(),
    };
    let report = resolve(&store, &token, &client).unwrap();
    assert_eq!(report.consumes, 1);
    assert_eq!(report.service_deps, 1);

    let edges = store
        .edges_for(&token, &call.id, Some(EdgeType::Consumes))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, endpoint.id);
    assert_eq!(edges[0].properties["inferred"], "true");
    assert_eq!(edges[0].properties["confidence"], "high");
    assert_eq!(edges[0].properties["method"], "llm_analysis");
}

#[test]
fn test_low_confidence_discarded() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    let (call, _) = seed_api_scenario(&store, &token);

    let client = CannedClient {
        response: r#"[{"endpoint_path": "/internal/widgets", "confidence": "low", "reason": "guess"}]"#
            .to_string(),
    };
    let report = resolve(&store, &token, &client).unwrap();
    assert_eq!(report, OracleReport::default());
    assert!(store
        .edges_for(&token, &call.id, Some(EdgeType::Consumes))
        .unwrap()
        .is_empty());
}

#[test]
fn test_already_resolved_calls_not_sent() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    let (call, endpoint) = seed_api_scenario(&store, &token);
    store
        .add_edge(&token, &Edge::new(EdgeType::Consumes, &call.id, &endpoint.id))
        .unwrap();

    // A client that panics on use proves no prompt was issued.
    struct Unreachable;
    impl ChatClient for Unreachable {
        fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
            panic!("oracle must not be consulted");
        }
    }
    let report = resolve(&store, &token, &Unreachable).unwrap();
    assert_eq!(report, OracleReport::default());
}

#[test]
fn test_event_edges_paired() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    let mut publisher = node(NodeType::Function, "publish_order_created", "orders/events.py");
    publisher.signature = "def publish_order_created(order)".to_string();
    let mut subscriber = node(NodeType::Function, "handle_event", "billing/consumer.py");
    subscriber.signature = "def handle_event(payload)".to_string();
    let orders = with_props(node(NodeType::Service, "orders", ""), &[("kind", "auto_detected")]);
    let billing = with_props(node(NodeType::Service, "billing", ""), &[("kind", "auto_detected")]);
    for n in [&publisher, &subscriber, &orders, &billing] {
        store.add_node(&token, n).unwrap();
    }

    let client = CannedClient {
        response: r#"[{"publisher": "publish_order_created", "subscriber": "handle_event",
"confidence": "medium", "reason": "order lifecycle"}]"#
            .to_string(),
    };
    let report = resolve(&store, &token, &client).unwrap();
    assert_eq!(report.event_calls, 1);
    assert_eq!(report.service_deps, 1);

    let edges = store
        .edges_for(&token, &publisher.id, Some(EdgeType::Calls))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].target_id, subscriber.id);
    assert_eq!(edges[0].properties["kind"], "event_driven");
}

#[test]
fn test_cancellation_aborts_before_chat() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    seed_api_scenario(&store, &token);
    token.cancel();

    let client = CannedClient {
        response: "[]".to_string(),
    };
    assert!(matches!(
        resolve(&store, &token, &client),
        Err(OracleError::Cancelled) | Err(OracleError::Store(_))
    ));
}
