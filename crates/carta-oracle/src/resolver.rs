//! The optional LLM post-pass: infer Consumes edges for API calls the
//! deterministic matcher could not resolve, and event-driven Calls edges
//! between publisher/subscriber functions.

use std::collections::HashMap;

use carta_core::{
    CancelToken, Edge, EdgeType, GraphStore, Node, NodeFilter, NodeType,
};
use carta_linker::{normalize_url, top_dir};

use crate::client::{ChatClient, OracleError};
use crate::json::extract_json_array;
use crate::prompt::{event_edges_prompt, unresolved_calls_prompt, CatalogEntry};

const PUBLISHER_MARKERS: [&str; 5] = ["publish", "emit", "send_event", "dispatch", "fire"];
const SUBSCRIBER_MARKERS: [&str; 5] =
    ["subscribe", "on_event", "handle_event", "consume", "listener"];

/// Edges appended by the oracle passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleReport {
    pub consumes: usize,
    pub event_calls: usize,
    pub service_deps: usize,
}

/// Run both passes. The oracle is a long-latency collaborator: the token
/// is checked before every chat round-trip and between emissions.
pub fn resolve(
    store: &dyn GraphStore,
    token: &CancelToken,
    client: &dyn ChatClient,
) -> Result<OracleReport, OracleError> {
    let mut report = OracleReport::default();
    resolve_unresolved_calls(store, token, client, &mut report)?;
    link_event_edges(store, token, client, &mut report)?;
    Ok(report)
}

fn check(token: &CancelToken) -> Result<(), OracleError> {
    if token.is_cancelled() {
        Err(OracleError::Cancelled)
    } else {
        Ok(())
    }
}

fn resolve_unresolved_calls(
    store: &dyn GraphStore,
    token: &CancelToken,
    client: &dyn ChatClient,
    report: &mut OracleReport,
) -> Result<(), OracleError> {
    let calls = store.find_nodes(
        token,
        &NodeFilter::by_type(NodeType::Dependency).with_property("kind", "api_call"),
    )?;
    let mut unresolved: Vec<Node> = Vec::new();
    for call in calls {
        if store
            .edges_for(token, &call.id, Some(EdgeType::Consumes))?
            .is_empty()
        {
            unresolved.push(call);
        }
    }
    if unresolved.is_empty() {
        return Ok(());
    }

    let endpoints = store.find_nodes(token, &NodeFilter::by_type(NodeType::ApiEndpoint))?;
    if endpoints.is_empty() {
        return Ok(());
    }
    let catalog: Vec<CatalogEntry> = endpoints
        .iter()
        .map(|endpoint| CatalogEntry {
            method: endpoint.prop("http_method").to_string(),
            path: best_path(endpoint).to_string(),
            service: top_dir(&endpoint.file_path),
            framework: endpoint.prop("framework").to_string(),
        })
        .collect();
    let services = services_by_top_dir(store, token)?;

    let mut groups: HashMap<String, Vec<&Node>> = HashMap::new();
    for call in &unresolved {
        groups.entry(top_dir(&call.file_path)).or_default().push(call);
    }
    let mut group_names: Vec<&String> = groups.keys().collect();
    group_names.sort();

    for group_name in group_names {
        let group = &groups[group_name.as_str()];
        check(token)?;
        let prompt = unresolved_calls_prompt(group_name, group, &catalog);
        let response = client.complete(&prompt)?;
        let Some(array) = extract_json_array(&response) else {
            tracing::warn!(service = %group_name, "oracle returned no JSON array");
            continue;
        };
        let matches: Vec<serde_json::Value> = match serde_json::from_str(array) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(service = %group_name, error = %e, "oracle JSON unparseable");
                continue;
            }
        };

        for matched in matches {
            check(token)?;
            let endpoint_path = matched
                .get("endpoint_path")
                .and_then(|p| p.as_str())
                .unwrap_or("");
            let confidence = matched
                .get("confidence")
                .and_then(|c| c.as_str())
                .unwrap_or("low");
            if endpoint_path.is_empty() || confidence == "low" {
                continue;
            }
            let reason = matched.get("reason").and_then(|r| r.as_str()).unwrap_or("");

            let wanted = normalize_url(endpoint_path);
            let Some(endpoint) = endpoints
                .iter()
                .find(|e| normalize_url(best_path(e)) == wanted)
            else {
                continue;
            };
            // The caller whose path shares the endpoint's segments, else
            // the group's first.
            let caller = group
                .iter()
                .find(|call| segments_overlap(&normalize_url(call.prop("path")), &wanted))
                .or_else(|| group.first())
                .copied();
            let Some(caller) = caller else { continue };

            let consumes = Edge::new(EdgeType::Consumes, &caller.id, &endpoint.id)
                .with_prop("inferred", "true")
                .with_prop("confidence", confidence)
                .with_prop("method", "llm_analysis")
                .with_prop("reason", reason);
            if store.add_edge(token, &consumes)? {
                report.consumes += 1;
            }

            let endpoint_top = top_dir(&endpoint.file_path);
            if *group_name != endpoint_top {
                if let (Some(consumer), Some(provider)) =
                    (services.get(group_name.as_str()), services.get(&endpoint_top))
                {
                    let depends = Edge::new(EdgeType::DependsOn, consumer, provider)
                        .with_prop("kind", "api_dependency")
                        .with_prop("inferred", "true")
                        .with_prop("confidence", confidence);
                    if store.add_edge(token, &depends)? {
                        report.service_deps += 1;
                    }
                }
            }
        }
    }
    Ok(())
}

fn link_event_edges(
    store: &dyn GraphStore,
    token: &CancelToken,
    client: &dyn ChatClient,
    report: &mut OracleReport,
) -> Result<(), OracleError> {
    let functions = store.find_nodes(token, &NodeFilter::by_type(NodeType::Function))?;
    let mut methods = store.find_nodes(token, &NodeFilter::by_type(NodeType::Method))?;
    let mut all = functions;
    all.append(&mut methods);

    let publishers: Vec<&Node> = all
        .iter()
        .filter(|f| matches_markers(f, &PUBLISHER_MARKERS))
        .collect();
    let subscribers: Vec<&Node> = all
        .iter()
        .filter(|f| matches_markers(f, &SUBSCRIBER_MARKERS))
        .collect();
    if publishers.is_empty() || subscribers.is_empty() {
        return Ok(());
    }

    check(token)?;
    let prompt = event_edges_prompt(&publishers, &subscribers);
    let response = client.complete(&prompt)?;
    let Some(array) = extract_json_array(&response) else {
        tracing::warn!("oracle returned no JSON array for event pairing");
        return Ok(());
    };
    let pairs: Vec<serde_json::Value> = match serde_json::from_str(array) {
        Ok(pairs) => pairs,
        Err(e) => {
            tracing::warn!(error = %e, "oracle event JSON unparseable");
            return Ok(());
        }
    };
    let services = services_by_top_dir(store, token)?;

    for pair in pairs {
        check(token)?;
        let confidence = pair
            .get("confidence")
            .and_then(|c| c.as_str())
            .unwrap_or("low");
        if confidence == "low" {
            continue;
        }
        let publisher_name = pair.get("publisher").and_then(|p| p.as_str()).unwrap_or("");
        let subscriber_name = pair
            .get("subscriber")
            .and_then(|s| s.as_str())
            .unwrap_or("");
        let (Some(publisher), Some(subscriber)) = (
            publishers.iter().find(|f| f.name == publisher_name),
            subscribers.iter().find(|f| f.name == subscriber_name),
        ) else {
            continue;
        };
        let reason = pair.get("reason").and_then(|r| r.as_str()).unwrap_or("");

        let calls = Edge::new(EdgeType::Calls, &publisher.id, &subscriber.id)
            .with_prop("kind", "event_driven")
            .with_prop("inferred", "true")
            .with_prop("confidence", confidence)
            .with_prop("reason", reason);
        if store.add_edge(token, &calls)? {
            report.event_calls += 1;
        }

        let publisher_top = top_dir(&publisher.file_path);
        let subscriber_top = top_dir(&subscriber.file_path);
        if publisher_top != subscriber_top {
            if let (Some(consumer), Some(producer)) = (
                services.get(&subscriber_top),
                services.get(&publisher_top),
            ) {
                let depends = Edge::new(EdgeType::DependsOn, consumer, producer)
                    .with_prop("kind", "event_dependency")
                    .with_prop("inferred", "true")
                    .with_prop("confidence", confidence);
                if store.add_edge(token, &depends)? {
                    report.service_deps += 1;
                }
            }
        }
    }
    Ok(())
}

fn matches_markers(function: &Node, markers: &[&str]) -> bool {
    let name = function.name.to_lowercase();
    let signature = function.signature.to_lowercase();
    markers
        .iter()
        .any(|m| name.contains(m) || signature.contains(m))
}

fn best_path(endpoint: &Node) -> &str {
    match endpoint.prop("full_path") {
        "" => endpoint.prop("path"),
        full => full,
    }
}

fn segments_overlap(call_path: &str, endpoint_path: &str) -> bool {
    call_path == endpoint_path
        || carta_linker::url::suffix_match(call_path, endpoint_path)
        || carta_linker::url::wildcard_match(call_path, endpoint_path)
}

/// top_dir → service node id.
fn services_by_top_dir(
    store: &dyn GraphStore,
    token: &CancelToken,
) -> Result<HashMap<String, String>, OracleError> {
    let mut map = HashMap::new();
    for service in store.find_nodes(token, &NodeFilter::by_type(NodeType::Service))? {
        let key = if service.file_path.is_empty() {
            service.name.clone()
        } else {
            top_dir(&service.file_path)
        };
        map.entry(key).or_insert(service.id);
    }
    Ok(map)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
