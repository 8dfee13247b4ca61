//! Phase 5: bind source-level import dependencies to the manifest
//! dependencies that provide them, across ecosystem naming conventions
//! (Go path prefixes, Python hyphen/underscore bridging).

use std::collections::HashMap;

use carta_core::{Edge, EdgeType, GraphError, Node, NodeFilter, NodeType};

use crate::linker::{top_dir, LinkContext};

pub(crate) fn run(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let manifest_deps = ctx.nodes(
        &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "manifest_dep"),
    )?;
    if manifest_deps.is_empty() {
        return Ok(0);
    }
    let mut by_name: HashMap<&str, Vec<&Node>> = HashMap::new();
    for dep in &manifest_deps {
        by_name.entry(&dep.name).or_default().push(dep);
    }

    let imports = ctx.nodes(
        &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "import"),
    )?;

    let mut added = 0;
    for import in &imports {
        let candidates = match_candidates(&import.name, &manifest_deps, &by_name);
        if candidates.is_empty() {
            continue;
        }

        // Prefer providers declared by the import's own service.
        let import_top = top_dir(&import.file_path);
        let same_service: Vec<&&Node> = candidates
            .iter()
            .filter(|dep| top_dir(&dep.file_path) == import_top)
            .collect();
        let chosen = same_service
            .first()
            .copied()
            .or(candidates.first())
            .copied();
        let Some(chosen) = chosen else { continue };

        let edge = Edge::new(EdgeType::DependsOn, &import.id, &chosen.id)
            .with_prop("kind", "import_to_manifest");
        if ctx.add_edge(&edge)? {
            added += 1;
        }
    }
    Ok(added)
}

/// The four-step matching ladder; the first step that yields candidates
/// wins.
fn match_candidates<'a>(
    import_name: &str,
    manifest_deps: &'a [Node],
    by_name: &HashMap<&str, Vec<&'a Node>>,
) -> Vec<&'a Node> {
    // 1. Exact name.
    if let Some(hits) = by_name.get(import_name) {
        return hits.clone();
    }

    // 2. Go-style path import: longest manifest name that is a
    //    whole-segment prefix. Ties go to the first found.
    if import_name.contains('/') {
        let padded = format!("{import_name}/");
        let mut best: Option<&Node> = None;
        for dep in manifest_deps {
            if padded.starts_with(&format!("{}/", dep.name))
                && best.map_or(true, |b| dep.name.len() > b.name.len())
            {
                best = Some(dep);
            }
        }
        if let Some(best) = best {
            return by_name.get(best.name.as_str()).cloned().unwrap_or_default();
        }
    }

    // 3. Dotted import: first component, raw and Python-normalized.
    if import_name.contains('.') {
        let first = import_name.split('.').next().unwrap_or(import_name);
        let lowered = first.to_lowercase();
        for candidate in [
            first.to_string(),
            lowered.replace('_', "-"),
            lowered.replace('-', "_"),
        ] {
            if let Some(hits) = by_name.get(candidate.as_str()) {
                return hits.clone();
            }
        }
    }

    // 4. Deeply dotted import: loose substring with manifest hyphens
    //    read as dots.
    if import_name.matches('.').count() >= 2 {
        let lowered_import = import_name.to_lowercase();
        let hits: Vec<&Node> = manifest_deps
            .iter()
            .filter(|dep| {
                let dotted = dep.name.replace('-', ".").to_lowercase();
                !dotted.is_empty() && lowered_import.contains(&dotted)
            })
            .collect();
        if !hits.is_empty() {
            return hits;
        }
    }

    Vec::new()
}
