//! Phase 3: match outbound api_call dependencies against the endpoint
//! catalog by normalized URL (exact, then whole-segment suffix, then
//! wildcard segments) and derive service-level dependencies.

use std::collections::{HashMap, HashSet};

use carta_core::{Edge, EdgeType, GraphError, Node, NodeFilter, NodeType};

use crate::linker::{top_dir, LinkContext};
use crate::url::{normalize_url, suffix_match, wildcard_match};

pub(crate) fn run(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let endpoints = ctx.nodes_of(NodeType::ApiEndpoint)?;
    if endpoints.is_empty() {
        return Ok(0);
    }
    // Index in stable order; full_path wins over the raw path.
    let mut by_url: HashMap<String, Vec<usize>> = HashMap::new();
    let mut urls: Vec<String> = Vec::with_capacity(endpoints.len());
    for (i, endpoint) in endpoints.iter().enumerate() {
        let path = match endpoint.prop("full_path") {
            "" => endpoint.prop("path"),
            full => full,
        };
        let url = normalize_url(path);
        by_url.entry(url.clone()).or_default().push(i);
        urls.push(url);
    }

    let calls = ctx.nodes(
        &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "api_call"),
    )?;
    let services = ctx.services_by_top_dir()?;
    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();

    let mut added = 0;
    for call in &calls {
        let raw = call.prop("path");
        if raw.is_empty() || raw == "UNKNOWN" {
            continue;
        }
        let wanted = normalize_url(raw);

        let matched = by_url
            .get(&wanted)
            .and_then(|hits| hits.first())
            .copied()
            .or_else(|| {
                urls.iter()
                    .position(|candidate| suffix_match(candidate, &wanted))
            })
            .or_else(|| {
                urls.iter()
                    .position(|candidate| wildcard_match(candidate, &wanted))
            });
        let Some(endpoint) = matched.map(|i| &endpoints[i]) else {
            continue;
        };

        let consumes = Edge::new(EdgeType::Consumes, &call.id, &endpoint.id)
            .with_prop("resolved", "true");
        if ctx.add_edge(&consumes)? {
            added += 1;
        }

        added += link_services(ctx, &services, &mut seen_pairs, call, endpoint)?;
    }
    Ok(added)
}

/// Cross-service api_dependency edge, deduped by ordered pair.
fn link_services(
    ctx: &LinkContext<'_>,
    services: &HashMap<String, Node>,
    seen_pairs: &mut HashSet<(String, String)>,
    call: &Node,
    endpoint: &Node,
) -> Result<usize, GraphError> {
    let caller_top = top_dir(&call.file_path);
    let endpoint_top = top_dir(&endpoint.file_path);
    if caller_top == endpoint_top {
        return Ok(0);
    }
    let (Some(caller), Some(provider)) =
        (services.get(&caller_top), services.get(&endpoint_top))
    else {
        return Ok(0);
    };
    if !seen_pairs.insert((caller.id.clone(), provider.id.clone())) {
        return Ok(0);
    }
    let edge = Edge::new(EdgeType::DependsOn, &caller.id, &provider.id)
        .with_prop("kind", "api_dependency");
    Ok(if ctx.add_edge(&edge)? { 1 } else { 0 })
}
