//! Phase 4: connect services through their declared manifest
//! dependencies (`kind = "library_dependency"`), with version-conflict
//! diagnostics in verbose mode.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use carta_core::{Edge, EdgeType, GraphError, Node, NodeFilter, NodeType};

use crate::linker::{top_dir, LinkContext};

pub(crate) fn run(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let services = ctx.nodes_of(NodeType::Service)?;
    let mut by_name: HashMap<&str, &Node> = HashMap::new();
    for service in &services {
        by_name.entry(&service.name).or_insert(service);
        let go_module = service.prop("go_module");
        if !go_module.is_empty() {
            by_name.entry(go_module).or_insert(service);
        }
    }
    let owners = ctx.services_by_top_dir()?;

    let deps = ctx.nodes(
        &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "manifest_dep"),
    )?;

    // dep name → versions seen (with the declaring service), for the
    // conflict diagnostic.
    let mut versions: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    let mut added = 0;
    for dep in &deps {
        let version = dep.prop("version");
        if !version.is_empty() {
            versions.entry(&dep.name).or_default().insert(version);
        }

        let Some(provider) = by_name.get(dep.name.as_str()) else {
            continue;
        };
        let Some(consumer) = owners.get(&top_dir(&dep.file_path)) else {
            continue;
        };
        if consumer.id == provider.id {
            continue;
        }
        let mut edge = Edge::new(EdgeType::DependsOn, &consumer.id, &provider.id)
            .with_prop("kind", "library_dependency")
            .with_prop("dep", &dep.name);
        if !version.is_empty() {
            edge = edge.with_prop("version", version);
        }
        if ctx.add_edge(&edge)? {
            added += 1;
        }
    }

    if ctx.verbose {
        for (name, seen) in &versions {
            if seen.len() > 1 {
                let list: Vec<&str> = seen.iter().copied().collect();
                tracing::warn!(
                    dep = name,
                    versions = list.join(", "),
                    "version conflict across services"
                );
            }
        }
    }

    Ok(added)
}
