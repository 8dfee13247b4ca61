use carta_core::{EdgeType, GraphStore, NodeType};

use crate::common::{find_node, index_and_link};

#[test]
fn test_gin_router_group_prefix() {
    let routes = r#"package main

import "github.com/gin-gonic/gin"

func setupRoutes(r *gin.Engine) {
	api := r.Group("/api/v1")
	api.GET("/users", listUsers)
}
"#;
    let (store, token, _) = index_and_link(&[("backend/routes.go", routes)]);

    let endpoint = find_node(&store, &token, NodeType::ApiEndpoint, "GET /api/v1/users");
    assert_eq!(endpoint.properties["path"], "/api/v1/users");
    assert_eq!(endpoint.properties["http_method"], "GET");
    assert_eq!(endpoint.properties["framework"], "gin");

    let setup = find_node(&store, &token, NodeType::Function, "setupRoutes");
    let exposes = store
        .edges_for(&token, &endpoint.id, Some(EdgeType::Exposes))
        .unwrap();
    assert!(exposes.iter().any(|e| e.source_id == setup.id));

    // After linking, the service also exposes the endpoint.
    let backend = find_node(&store, &token, NodeType::Service, "backend");
    assert!(exposes.iter().any(|e| e.source_id == backend.id));
}

#[test]
fn test_nested_group_prefixes_compose() {
    let routes = r#"package main

func setupRoutes(r *gin.Engine) {
	api := r.Group("/api")
	v2 := api.Group("/v2")
	v2.DELETE("/sessions/:id", dropSession)
}
"#;
    let (store, token, _) = index_and_link(&[("backend/routes.go", routes)]);
    let endpoint = find_node(
        &store,
        &token,
        NodeType::ApiEndpoint,
        "DELETE /api/v2/sessions/:id",
    );
    assert_eq!(endpoint.properties["path"], "/api/v2/sessions/:id");
}
