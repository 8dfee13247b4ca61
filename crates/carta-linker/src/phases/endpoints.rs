//! Phase 2: resolve router-mount prefixes onto endpoints (walking from
//! the endpoint's directory upward) and expose endpoints from their
//! services.

use std::collections::HashMap;

use carta_core::{Edge, EdgeType, GraphError, Node, NodeFilter, NodeType};

use crate::linker::{top_dir, LinkContext};
use crate::url::join_prefix;

pub(crate) fn run(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let endpoints = ctx.nodes_of(NodeType::ApiEndpoint)?;
    if endpoints.is_empty() {
        return Ok(0);
    }

    let mounts = ctx.nodes(
        &NodeFilter::by_type(NodeType::Variable).with_property("kind", "router_mount"),
    )?;
    let mut mounts_by_dir: HashMap<&str, &Node> = HashMap::new();
    for mount in &mounts {
        // First mount per directory wins (find_nodes order is stable).
        mounts_by_dir.entry(dirname(&mount.file_path)).or_insert(mount);
    }

    let services = ctx.services_by_top_dir()?;

    let mut added = 0;
    for endpoint in endpoints {
        if let Some(prefix) = find_prefix(&mounts_by_dir, &endpoint.file_path) {
            let full = join_prefix(prefix, endpoint.prop("path"));
            if endpoint.prop("full_path") != full {
                let mut updated = endpoint.clone();
                updated
                    .properties
                    .insert("full_path".to_string(), full);
                ctx.store.update_node(ctx.token, &updated)?;
            }
        }

        if let Some(service) = services.get(&top_dir(&endpoint.file_path)) {
            if ctx.add_edge(&Edge::new(EdgeType::Exposes, &service.id, &endpoint.id))? {
                added += 1;
            }
        }
    }
    Ok(added)
}

/// Walk from the endpoint's directory upward until a mount prefix is
/// found.
fn find_prefix<'n>(
    mounts_by_dir: &HashMap<&str, &'n Node>,
    file_path: &str,
) -> Option<&'n str> {
    let mut dir = dirname(file_path);
    loop {
        if let Some(mount) = mounts_by_dir.get(dir) {
            let prefix = mount.prop("prefix");
            if !prefix.is_empty() {
                return Some(prefix);
            }
        }
        if dir.is_empty() {
            return None;
        }
        dir = dirname(dir);
    }
}

fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
