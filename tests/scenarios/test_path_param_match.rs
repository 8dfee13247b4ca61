use carta_core::{EdgeType, GraphStore, NodeFilter, NodeType};

use crate::common::{find_node, index_and_link};

#[test]
fn test_literal_segment_matches_path_parameter() {
    let server = r#"package main

func routes(r *gin.Engine) {
	api := r.Group("/api/v1")
	api.GET("/users/{id}", getUser)
}
"#;
    let client = r#"import requests

def fetch_user():
    return requests.get("http://users-svc/api/v1/users/123")
"#;
    let (store, token, _) = index_and_link(&[
        ("users/routes.go", server),
        ("frontend/client.py", client),
    ]);

    let endpoint = find_node(&store, &token, NodeType::ApiEndpoint, "GET /api/v1/users/{id}");
    let call = find_node(&store, &token, NodeType::Dependency, "GET /api/v1/users/123");

    let consumes = store
        .edges_for(&token, &call.id, Some(EdgeType::Consumes))
        .unwrap();
    assert_eq!(consumes.len(), 1);
    assert_eq!(consumes[0].target_id, endpoint.id);
    assert_eq!(consumes[0].properties["resolved"], "true");

    // Caller and endpoint live in different services.
    let frontend = find_node(&store, &token, NodeType::Service, "frontend");
    let users = find_node(&store, &token, NodeType::Service, "users");
    let deps = store
        .edges_for(&token, &frontend.id, Some(EdgeType::DependsOn))
        .unwrap();
    assert!(deps.iter().any(|e| {
        e.target_id == users.id && e.properties.get("kind").map(String::as_str) == Some("api_dependency")
    }));
}

#[test]
fn test_unrelated_paths_do_not_match() {
    let server = r#"package main

func routes(r *gin.Engine) {
	r.GET("/api/v1/orders", listOrders)
}
"#;
    let client = r#"import requests

def fetch():
    return requests.get("http://svc/api/v1/users")
"#;
    let (store, token, _) = index_and_link(&[
        ("orders/routes.go", server),
        ("frontend/client.py", client),
    ]);

    let calls = store
        .find_nodes(
            &token,
            &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "api_call"),
        )
        .unwrap();
    assert_eq!(calls.len(), 1);
    assert!(store
        .edges_for(&token, &calls[0].id, Some(EdgeType::Consumes))
        .unwrap()
        .is_empty());
}

#[test]
fn test_gateway_prefix_suffix_match() {
    let server = r#"package main

func routes(r *gin.Engine) {
	r.GET("/v1/items", listItems)
}
"#;
    let client = r#"import requests

def fetch():
    return requests.get("http://gateway/api/public/v1/items")
"#;
    let (store, token, _) = index_and_link(&[
        ("items/routes.go", server),
        ("frontend/client.py", client),
    ]);

    let call = find_node(&store, &token, NodeType::Dependency, "GET /api/public/v1/items");
    assert_eq!(
        store
            .edges_for(&token, &call.id, Some(EdgeType::Consumes))
            .unwrap()
            .len(),
        1
    );
}
