//! Phase 6: interface-implementation resolution in three sub-phases:
//! structural (Go method sets, with embedding promotion), nominal
//! (Java/TypeScript/C# `implements` lists), and protocol (Python
//! classes over Protocol interfaces).

use std::collections::{HashMap, HashSet};

use carta_core::{Edge, EdgeType, GraphError, Node, NodeFilter, NodeType};

use crate::linker::{top_dir, LinkContext};

pub(crate) fn run(ctx: &LinkContext<'_>) -> Result<usize, GraphError> {
    let interfaces = ctx.nodes_of(NodeType::Interface)?;
    if interfaces.is_empty() {
        return Ok(0);
    }

    // Existing Implements edges (including in-file ones the extractors
    // emitted) guard against cross-phase duplicates.
    let mut visited: HashSet<String> = HashSet::new();
    for interface in &interfaces {
        for edge in ctx
            .store
            .edges_for(ctx.token, &interface.id, Some(EdgeType::Implements))?
        {
            visited.insert(format!("{}→{}", edge.source_id, edge.target_id));
        }
    }

    let mut added = 0;
    added += structural(ctx, &interfaces, &mut visited)?;
    added += nominal(ctx, &interfaces, &mut visited)?;
    added += protocol(ctx, &interfaces, &mut visited)?;
    Ok(added)
}

fn emit(
    ctx: &LinkContext<'_>,
    visited: &mut HashSet<String>,
    source: &Node,
    target: &Node,
    kind: &str,
) -> Result<usize, GraphError> {
    let key = format!("{}→{}", source.id, target.id);
    if !visited.insert(key) {
        return Ok(0);
    }
    let edge =
        Edge::new(EdgeType::Implements, &source.id, &target.id).with_prop("kind", kind);
    Ok(if ctx.add_edge(&edge)? { 1 } else { 0 })
}

/// Go structural typing: a struct implements an interface when its
/// method set (own receivers plus methods promoted from embedded types)
/// covers the interface's. Same-file matches are already linked in-file.
fn structural(
    ctx: &LinkContext<'_>,
    interfaces: &[Node],
    visited: &mut HashSet<String>,
) -> Result<usize, GraphError> {
    let go = Some("go".to_string());
    let structs = ctx.nodes(&NodeFilter {
        node_type: Some(NodeType::Struct),
        language: go.clone(),
        ..Default::default()
    })?;
    if structs.is_empty() {
        return Ok(0);
    }
    let methods = ctx.nodes(&NodeFilter {
        node_type: Some(NodeType::Method),
        language: go.clone(),
        ..Default::default()
    })?;

    let mut methods_by_receiver: HashMap<&str, HashSet<&str>> = HashMap::new();
    for method in &methods {
        let receiver = method.prop("receiver");
        if !receiver.is_empty() {
            methods_by_receiver
                .entry(receiver)
                .or_default()
                .insert(&method.name);
        }
    }
    let structs_by_name: HashMap<&str, &Node> =
        structs.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut added = 0;
    for interface in interfaces {
        if interface.language != "go" {
            continue;
        }
        let required: Vec<&str> = interface
            .prop("methods")
            .split(',')
            .filter(|m| !m.is_empty())
            .collect();
        if required.is_empty() {
            continue;
        }
        for strukt in &structs {
            if strukt.file_path == interface.file_path {
                continue;
            }
            let mut have: HashSet<&str> = HashSet::new();
            collect_method_set(
                strukt.name.as_str(),
                &methods_by_receiver,
                &structs_by_name,
                &mut HashSet::new(),
                &mut have,
            );
            if required.iter().all(|m| have.contains(m)) {
                added += emit(ctx, visited, strukt, interface, "structural")?;
            }
        }
    }
    Ok(added)
}

/// Own methods plus methods promoted through embedded structs.
fn collect_method_set<'a>(
    type_name: &'a str,
    methods_by_receiver: &HashMap<&'a str, HashSet<&'a str>>,
    structs_by_name: &HashMap<&'a str, &'a Node>,
    seen: &mut HashSet<&'a str>,
    out: &mut HashSet<&'a str>,
) {
    if !seen.insert(type_name) {
        return;
    }
    if let Some(own) = methods_by_receiver.get(type_name) {
        out.extend(own.iter().copied());
    }
    if let Some(strukt) = structs_by_name.get(type_name) {
        for embedded in strukt.prop("embeds").split(',').filter(|e| !e.is_empty()) {
            // Qualified embeds (pkg.Type) are out of same-index reach.
            if let Some(plain) = structs_by_name.get_key_value(embedded) {
                collect_method_set(plain.0, methods_by_receiver, structs_by_name, seen, out);
            }
        }
    }
}

/// Nominal implementation: the class names its interfaces. Candidate
/// tie-break: same top-level directory, then same package, then first.
fn nominal(
    ctx: &LinkContext<'_>,
    interfaces: &[Node],
    visited: &mut HashSet<String>,
) -> Result<usize, GraphError> {
    let mut by_name: HashMap<&str, Vec<&Node>> = HashMap::new();
    for interface in interfaces {
        by_name.entry(&interface.name).or_default().push(interface);
    }

    let classes = ctx.nodes_of(NodeType::Class)?;
    let mut added = 0;
    for class in &classes {
        if !matches!(class.language.as_str(), "java" | "typescript" | "javascript" | "csharp")
        {
            continue;
        }
        for name in class.prop("implements").split(',').filter(|n| !n.is_empty()) {
            let Some(candidates) = by_name.get(name.trim()) else {
                continue;
            };
            if let Some(best) = best_candidate(class, candidates) {
                added += emit(ctx, visited, class, best, "nominal")?;
            }
        }
    }
    Ok(added)
}

/// Python protocol implementation: a class whose bases name a Protocol
/// interface.
fn protocol(
    ctx: &LinkContext<'_>,
    interfaces: &[Node],
    visited: &mut HashSet<String>,
) -> Result<usize, GraphError> {
    let mut by_name: HashMap<&str, Vec<&Node>> = HashMap::new();
    for interface in interfaces {
        if interface.prop("protocol") == "true" {
            by_name.entry(&interface.name).or_default().push(interface);
        }
    }
    if by_name.is_empty() {
        return Ok(0);
    }

    let classes = ctx.nodes(&NodeFilter {
        node_type: Some(NodeType::Class),
        language: Some("python".to_string()),
        ..Default::default()
    })?;

    let mut added = 0;
    for class in &classes {
        for base in class.prop("bases").split(',').filter(|b| !b.is_empty()) {
            // Bases may be qualified: ports.Store names Store.
            let simple = base.rsplit('.').next().unwrap_or(base).trim();
            let Some(candidates) = by_name.get(simple) else {
                continue;
            };
            if let Some(best) = best_candidate(class, candidates) {
                added += emit(ctx, visited, class, best, "protocol")?;
            }
        }
    }
    Ok(added)
}

fn best_candidate<'a>(class: &Node, candidates: &[&'a Node]) -> Option<&'a Node> {
    let class_top = top_dir(&class.file_path);
    candidates
        .iter()
        .find(|c| top_dir(&c.file_path) == class_top)
        .or_else(|| {
            candidates
                .iter()
                .find(|c| !class.package.is_empty() && c.package == class.package)
        })
        .or_else(|| candidates.first())
        .copied()
}
