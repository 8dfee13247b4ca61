use carta_core::NodeType;

use crate::common::{find_node, index_and_link};

#[test]
fn test_fastapi_router_mounted_with_prefix() {
    let routes = r#"from fastapi import APIRouter

router = APIRouter()


@router.get("/instances/{id}")
def get_instance(id: str):
    return {}
"#;
    let main = r#"from fastapi import FastAPI
from hypatia.routes import instances

app = FastAPI()
app.include_router(instances.router, prefix="/api/v1")
"#;
    let (store, token, _) = index_and_link(&[
        ("hypatia/routes/instances.py", routes),
        ("hypatia/main.py", main),
    ]);

    let endpoint = find_node(&store, &token, NodeType::ApiEndpoint, "GET /instances/{id}");
    assert_eq!(endpoint.properties["full_path"], "/api/v1/instances/{id}");
}

#[test]
fn test_unmounted_endpoint_keeps_no_full_path() {
    let routes = r#"@router.get("/health")
def health():
    return "ok"
"#;
    let (store, token, _) = index_and_link(&[("svc/routes.py", routes)]);
    let endpoint = find_node(&store, &token, NodeType::ApiEndpoint, "GET /health");
    assert!(!endpoint.properties.contains_key("full_path"));
}
