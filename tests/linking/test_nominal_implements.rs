use carta_core::{EdgeType, GraphStore, NodeType};

use crate::common::{find_node, index_and_link};

#[test]
fn test_typescript_implements_resolves_cross_file() {
    let iface = r#"export interface Store {
    add(item: string): void;
}
"#;
    let class = r#"export class SqlStore implements Store {
    add(item: string): void {}
}
"#;
    let (store, token, _) = index_and_link(&[
        ("web/src/store.ts", iface),
        ("web/src/sql_store.ts", class),
    ]);

    let interface = find_node(&store, &token, NodeType::Interface, "Store");
    let class_node = find_node(&store, &token, NodeType::Class, "SqlStore");
    let edges = store
        .edges_for(&token, &interface.id, Some(EdgeType::Implements))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_id, class_node.id);
    assert_eq!(edges[0].properties["kind"], "nominal");
}

#[test]
fn test_same_top_dir_candidate_preferred() {
    let iface = "export interface Codec {\n    encode(): string;\n}\n";
    let (store, token, _) = index_and_link(&[
        ("web/src/codec.ts", iface),
        ("other/src/codec.ts", iface),
        (
            "web/src/json_codec.ts",
            "export class JsonCodec implements Codec {\n    encode(): string { return \"\"; }\n}\n",
        ),
    ]);

    let class_node = find_node(&store, &token, NodeType::Class, "JsonCodec");
    let edges = store
        .edges_for(&token, &class_node.id, Some(EdgeType::Implements))
        .unwrap();
    assert_eq!(edges.len(), 1);
    let target = store.get_node(&token, &edges[0].target_id).unwrap().unwrap();
    assert_eq!(target.file_path, "web/src/codec.ts");
}

#[test]
fn test_python_protocol_implementation() {
    let ports = r#"from typing import Protocol

class Notifier(Protocol):
    def send(self, message): ...
"#;
    let impls = r#"class EmailNotifier:
    def send(self, message):
        return True
"#;
    let adapters = r#"from svc.ports import Notifier

class SmsNotifier(Notifier):
    def send(self, message):
        return True
"#;
    let (store, token, _) = index_and_link(&[
        ("svc/ports.py", ports),
        ("svc/email.py", impls),
        ("svc/sms.py", adapters),
    ]);

    let protocol = find_node(&store, &token, NodeType::Interface, "Notifier");
    assert_eq!(protocol.properties["protocol"], "true");

    let sms = find_node(&store, &token, NodeType::Class, "SmsNotifier");
    let edges = store
        .edges_for(&token, &protocol.id, Some(EdgeType::Implements))
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_id, sms.id);
    assert_eq!(edges[0].properties["kind"], "protocol");
}
