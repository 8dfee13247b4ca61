//! Prompt construction for the two resolver passes.

use carta_core::Node;

/// Pair a service's unresolved outbound calls with the full endpoint
/// catalog and ask for JSON matches.
pub fn unresolved_calls_prompt(service: &str, calls: &[&Node], catalog: &[CatalogEntry]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are matching outbound HTTP calls to the API endpoints they most likely target.\n\n",
    );
    prompt.push_str(&format!("Unresolved calls from service `{service}`:\n"));
    for call in calls {
        prompt.push_str(&format!(
            "- {} {} (framework: {})\n",
            call.prop("http_method"),
            call.prop("path"),
            call.prop("framework"),
        ));
    }
    prompt.push_str("\nKnown endpoints:\n");
    for entry in catalog {
        prompt.push_str(&format!(
            "- {} {} (service: {}, framework: {})\n",
            entry.method, entry.path, entry.service, entry.framework,
        ));
    }
    prompt.push_str(
        "\nRespond with a JSON array only. One object per confident match:\n\
         [{\"endpoint_path\": \"/api/v1/x\", \"confidence\": \"high|medium|low\", \
         \"reason\": \"...\"}]\n\
         Use an empty array when nothing matches.",
    );
    prompt
}

/// Ask the oracle to pair publisher-looking functions with
/// subscriber-looking functions.
pub fn event_edges_prompt(publishers: &[&Node], subscribers: &[&Node]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are pairing event publishers with the subscribers that most likely consume \
         their events.\n\nPublishers:\n",
    );
    for publisher in publishers {
        prompt.push_str(&format!(
            "- {} ({}) in {}\n",
            publisher.name, publisher.signature, publisher.file_path,
        ));
    }
    prompt.push_str("\nSubscribers:\n");
    for subscriber in subscribers {
        prompt.push_str(&format!(
            "- {} ({}) in {}\n",
            subscriber.name, subscriber.signature, subscriber.file_path,
        ));
    }
    prompt.push_str(
        "\nRespond with a JSON array only:\n\
         [{\"publisher\": \"name\", \"subscriber\": \"name\", \
         \"confidence\": \"high|medium|low\", \"reason\": \"...\"}]\n\
         Use an empty array when nothing pairs.",
    );
    prompt
}

/// One endpoint row shown to the oracle.
pub struct CatalogEntry {
    pub method: String,
    pub path: String,
    pub service: String,
    pub framework: String,
}
