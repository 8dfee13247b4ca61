use carta_core::sqlite::SqliteStore;
use carta_core::CancelToken;
use carta_linker::Linker;

use crate::common::{all_edge_count, index_into};

const FIXTURE: &[(&str, &str)] = &[
    (
        "users/routes.go",
        r#"package main

import "github.com/gin-gonic/gin"

func routes(r *gin.Engine) {
	api := r.Group("/api/v1")
	api.GET("/users/{id}", getUser)
}
"#,
    ),
    (
        "users/go.mod",
        "module github.com/acme/users\n\nrequire github.com/gin-gonic/gin v1.9.1\n",
    ),
    (
        "frontend/client.py",
        r#"import requests

def fetch_user():
    return requests.get("http://users/api/v1/users/7")
"#,
    ),
    (
        "frontend/test_client.py",
        r#"def test_fetch_user():
    assert True
"#,
    ),
];

#[test]
fn test_rerunning_all_phases_adds_nothing() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    index_into(&store, &token, FIXTURE);

    let linker = Linker::new(&store, &token);
    let first = linker.run_all().unwrap();
    assert!(first.total() > 0);
    let edges_after_first = all_edge_count(&store, &token);

    let second = linker.run_all().unwrap();
    assert_eq!(second.total(), 0, "second run must append nothing");
    assert_eq!(all_edge_count(&store, &token), edges_after_first);
}

#[test]
fn test_reindex_then_relink_converges() {
    let store = SqliteStore::in_memory().unwrap();
    let token = CancelToken::new();
    index_into(&store, &token, FIXTURE);
    let linker = Linker::new(&store, &token);
    linker.run_all().unwrap();

    // Re-index one unchanged file and relink: deleted edges reappear,
    // nothing else grows.
    let before = all_edge_count(&store, &token);
    index_into(&store, &token, &FIXTURE[..1]);
    linker.run_all().unwrap();
    linker.run_all().unwrap();
    assert_eq!(all_edge_count(&store, &token), before);
}
