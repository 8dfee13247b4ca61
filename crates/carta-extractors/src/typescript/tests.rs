use carta_core::{EdgeType, NodeType};

use crate::extractor::Extractor;
use crate::typescript::{JavaScriptExtractor, TypeScriptExtractor};

fn parse(path: &str, source: &str) -> crate::extractor::ParseResult {
    TypeScriptExtractor.parse_file(path, source.as_bytes()).unwrap()
}

fn find<'a>(
    result: &'a crate::extractor::ParseResult,
    node_type: NodeType,
    name: &str,
) -> &'a carta_core::Node {
    result
        .nodes
        .iter()
        .find(|n| n.node_type == node_type && n.name == name)
        .unwrap_or_else(|| panic!("no {node_type:?} named {name}"))
}

#[test]
fn test_imports_and_exports() {
    let result = parse(
        "web/src/api.ts",
        r#"import axios from "axios";
import { UserRepo as Repo } from "./repo";

export function listUsers(): Promise<void> {
    return axios.get("/api/v1/users");
}

function internal() {}
"#,
    );
    find(&result, NodeType::Dependency, "axios");
    find(&result, NodeType::Dependency, "./repo");
    let list = find(&result, NodeType::Function, "listUsers");
    assert!(list.exported);
    let internal = find(&result, NodeType::Function, "internal");
    assert!(!internal.exported);
}

#[test]
fn test_commonjs_require() {
    let result = JavaScriptExtractor
        .parse_file(
            "web/server.js",
            br#"const express = require("express");

const app = express();
"#,
        )
        .unwrap();
    let dep = find(&result, NodeType::Dependency, "express");
    assert_eq!(dep.prop("kind"), "import");
    assert_eq!(result.language, carta_core::Language::JavaScript);
}

#[test]
fn test_class_implements_and_fields() {
    let result = parse(
        "web/src/repo.ts",
        r#"interface Store {
    add(item: string): void;
    get(key: string): string;
}

export class MemoryStore implements Store {
    items: string[] = [];

    add(item: string): void {
        this.items.push(item);
    }

    get(key: string): string {
        return key;
    }
}
"#,
    );
    let iface = find(&result, NodeType::Interface, "Store");
    assert_eq!(iface.prop("methods"), "add,get");
    let class = find(&result, NodeType::Class, "MemoryStore");
    assert_eq!(class.prop("implements"), "Store");
    assert_eq!(class.prop("fields"), "items");
    let add = find(&result, NodeType::Method, "add");
    assert_eq!(add.prop("receiver"), "MemoryStore");
}

#[test]
fn test_express_routes_and_mount() {
    let result = parse(
        "web/server.ts",
        r#"import express from "express";
import users from "./routes/users";

const app = express();
app.use("/api/v1", users);
app.get("/health", healthCheck);
"#,
    );
    let mount = find(&result, NodeType::Variable, "users");
    assert_eq!(mount.prop("kind"), "router_mount");
    assert_eq!(mount.prop("prefix"), "/api/v1");

    let ep = find(&result, NodeType::ApiEndpoint, "GET /health");
    assert_eq!(ep.prop("framework"), "express");
    assert_eq!(ep.prop("handler"), "healthCheck");
}

#[test]
fn test_route_inside_function_gets_exposes_edge() {
    let result = parse(
        "web/routes.ts",
        r#"export function register(router: any) {
    router.post("/users", createUser);
}
"#,
    );
    let register = find(&result, NodeType::Function, "register");
    let ep = find(&result, NodeType::ApiEndpoint, "POST /users");
    assert!(result.edges.iter().any(|e| {
        e.edge_type == EdgeType::Exposes && e.source_id == register.id && e.target_id == ep.id
    }));
}

#[test]
fn test_fetch_with_options_method() {
    let result = parse(
        "web/src/client.ts",
        r#"export async function save(data: unknown) {
    await fetch("/api/v1/items", { method: "POST" });
}
"#,
    );
    let call = find(&result, NodeType::Dependency, "POST /api/v1/items");
    assert_eq!(call.prop("kind"), "api_call");
    assert_eq!(call.prop("framework"), "fetch");
}

#[test]
fn test_template_url_collapses_to_wildcard() {
    let result = parse(
        "web/src/client.ts",
        r#"export function load(id: string) {
    return fetch(`/api/v1/items/${id}`);
}
"#,
    );
    let call = find(&result, NodeType::Dependency, "GET /api/v1/items/*");
    assert_eq!(call.prop("path"), "/api/v1/items/*");
}

#[test]
fn test_arrow_function_declaration_and_call() {
    let result = parse(
        "web/src/util.ts",
        r#"const double = (x: number) => x * 2;

export function quadruple(x: number) {
    return double(double(x));
}
"#,
    );
    let double = find(&result, NodeType::Function, "double");
    let quad = find(&result, NodeType::Function, "quadruple");
    assert!(result.edges.iter().any(|e| {
        e.edge_type == EdgeType::Calls && e.source_id == quad.id && e.target_id == double.id
    }));
}

#[test]
fn test_spec_file_functions_are_tests() {
    let result = parse(
        "web/src/user.spec.ts",
        r#"function checkInvariants() {}
"#,
    );
    find(&result, NodeType::TestFile, "user.spec.ts");
    find(&result, NodeType::TestFunction, "checkInvariants");
}
