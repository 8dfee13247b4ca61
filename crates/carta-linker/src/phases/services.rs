//! Phase 1: group files by top-level directory, auto-detect missing
//! Service nodes, and attach every file to its service.

use std::collections::HashMap;

use carta_core::{Edge, EdgeType, GraphError, Node, NodeType};

use crate::linker::{top_dir, LinkContext};

pub(crate) fn run(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let mut files = ctx.nodes_of(NodeType::File)?;
    files.extend(ctx.nodes_of(NodeType::TestFile)?);

    let mut services = ctx.services_by_top_dir()?;

    let mut groups: HashMap<String, Vec<&Node>> = HashMap::new();
    for file in &files {
        let top = top_dir(&file.file_path);
        if top.is_empty() {
            continue;
        }
        groups.entry(top).or_default().push(file);
    }

    let mut added = 0;
    let mut tops: Vec<&String> = groups.keys().collect();
    tops.sort();
    for top in tops {
        let service_id = match services.get(top.as_str()) {
            Some(service) => service.id.clone(),
            None => {
                // Auto-detected service: no backing manifest, empty path.
                let mut service = Node::new(NodeType::Service, top, "");
                service.qualified_name = top.clone();
                service.exported = true;
                service
                    .properties
                    .insert("kind".to_string(), "auto_detected".to_string());
                ctx.store.add_node(ctx.token, &service)?;
                let id = service.id.clone();
                services.insert(top.clone(), service);
                id
            }
        };
        for file in &groups[top.as_str()] {
            if ctx.add_edge(&Edge::new(EdgeType::Contains, &service_id, &file.id))? {
                added += 1;
            }
        }
    }
    Ok(added)
}
