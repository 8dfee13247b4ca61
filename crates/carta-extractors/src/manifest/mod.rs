//! Dependency-manifest extractor: `pyproject.toml`, `requirements.txt`,
//! `setup.py`, `package.json`, and `go.mod`.
//!
//! Each manifest yields a File node, one Service node (named from the
//! manifest's declared package, falling back to the enclosing
//! directory), and one Dependency node per requirement with the version
//! string preserved verbatim.

use carta_core::{Edge, EdgeType, Language, Node, NodeType};

use crate::builder::GraphBuilder;
use crate::extractor::{ExtractError, Extractor, ParseResult};
use crate::strings::{basename, dirname, unquote};

pub struct ManifestExtractor;

impl ManifestExtractor {
    pub const FILENAMES: [&'static str; 5] = [
        "pyproject.toml",
        "requirements.txt",
        "setup.py",
        "package.json",
        "go.mod",
    ];
}

struct ManifestDep {
    name: String,
    version: String,
    scope: String,
    /// "import"-style include of another requirements file.
    include: bool,
}

impl ManifestDep {
    fn new(name: &str, version: &str) -> Self {
        ManifestDep {
            name: name.to_string(),
            version: version.to_string(),
            scope: String::new(),
            include: false,
        }
    }

    fn dev(mut self) -> Self {
        self.scope = "dev".to_string();
        self
    }
}

impl Extractor for ManifestExtractor {
    fn language(&self) -> Language {
        Language::Unknown
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn parse_file(&self, path: &str, content: &[u8]) -> Result<ParseResult, ExtractError> {
        let source = std::str::from_utf8(content)
            .map_err(|_| ExtractError::Utf8(path.to_string()))?;
        let (service_name, version, ecosystem, deps, extra_props) = match basename(path) {
            "pyproject.toml" => parse_pyproject(path, source)?,
            "requirements.txt" => parse_requirements(source),
            "setup.py" => parse_setup_py(source),
            "package.json" => parse_package_json(path, source)?,
            "go.mod" => parse_go_mod(source),
            other => {
                return Err(ExtractError::Manifest {
                    path: path.to_string(),
                    message: format!("unrecognized manifest name: {other}"),
                })
            }
        };

        let mut builder = GraphBuilder::new(path, Language::Unknown);
        builder.set_file_end(source.lines().count().max(1) as u32);

        let service_name = if service_name.is_empty() {
            let dir = basename(dirname(path));
            if dir.is_empty() {
                "(root)".to_string()
            } else {
                dir.to_string()
            }
        } else {
            service_name
        };

        let mut service = Node::new(NodeType::Service, &service_name, path);
        service.qualified_name = service_name.clone();
        service.exported = true;
        service
            .properties
            .insert("kind".to_string(), "service".to_string());
        service
            .properties
            .insert("ecosystem".to_string(), ecosystem.to_string());
        if !version.is_empty() {
            service.properties.insert("version".to_string(), version);
        }
        for (key, value) in extra_props {
            service.properties.insert(key, value);
        }
        let service_id = service.id.clone();
        builder.push_node(service);
        let file_id = builder.file_id().to_string();
        builder.edge(Edge::new(EdgeType::Contains, &file_id, &service_id));

        let manifest_base = basename(path).to_string();
        for dep in deps {
            if dep.name.is_empty() {
                continue;
            }
            let mut node = Node::new(NodeType::Dependency, &dep.name, path);
            node.qualified_name = dep.name.clone();
            let kind = if dep.include { "include" } else { "manifest_dep" };
            node.properties.insert("kind".to_string(), kind.to_string());
            node.properties
                .insert("ecosystem".to_string(), ecosystem.to_string());
            node.properties
                .insert("source".to_string(), manifest_base.clone());
            if !dep.version.is_empty() {
                node.properties.insert("version".to_string(), dep.version);
            }
            if !dep.scope.is_empty() {
                node.properties.insert("scope".to_string(), dep.scope);
            }
            let dep_id = node.id.clone();
            builder.push_node(node);
            builder.edge(Edge::new(EdgeType::DependsOn, &service_id, &dep_id));
        }

        Ok(builder.finish())
    }
}

type Parsed = (
    String,                       // service name
    String,                       // service version
    &'static str,                 // ecosystem
    Vec<ManifestDep>,             // requirements
    Vec<(String, String)>,        // extra service properties
);

fn parse_pyproject(path: &str, source: &str) -> Result<Parsed, ExtractError> {
    let value: toml::Value = toml::from_str(source).map_err(|e| ExtractError::Manifest {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    let mut deps = Vec::new();
    let mut name = String::new();
    let mut version = String::new();

    if let Some(project) = value.get("project") {
        name = str_of(project.get("name"));
        version = str_of(project.get("version"));
        if let Some(list) = project.get("dependencies").and_then(|d| d.as_array()) {
            for requirement in list.iter().filter_map(|v| v.as_str()) {
                deps.push(split_requirement(requirement));
            }
        }
        if let Some(groups) = project
            .get("optional-dependencies")
            .and_then(|d| d.as_table())
        {
            for list in groups.values().filter_map(|v| v.as_array()) {
                for requirement in list.iter().filter_map(|v| v.as_str()) {
                    deps.push(split_requirement(requirement).dev());
                }
            }
        }
    }

    if let Some(poetry) = value.get("tool").and_then(|t| t.get("poetry")) {
        if name.is_empty() {
            name = str_of(poetry.get("name"));
        }
        if version.is_empty() {
            version = str_of(poetry.get("version"));
        }
        if let Some(table) = poetry.get("dependencies").and_then(|d| d.as_table()) {
            for (dep_name, spec) in table {
                if dep_name == "python" {
                    continue;
                }
                deps.push(ManifestDep::new(dep_name, &poetry_version(spec)));
            }
        }
        for dev_key in ["dev-dependencies", "group"] {
            let Some(section) = poetry.get(dev_key) else { continue };
            if dev_key == "dev-dependencies" {
                if let Some(table) = section.as_table() {
                    for (dep_name, spec) in table {
                        deps.push(ManifestDep::new(dep_name, &poetry_version(spec)).dev());
                    }
                }
            } else if let Some(groups) = section.as_table() {
                for group in groups.values() {
                    if let Some(table) = group.get("dependencies").and_then(|d| d.as_table()) {
                        for (dep_name, spec) in table {
                            deps.push(ManifestDep::new(dep_name, &poetry_version(spec)).dev());
                        }
                    }
                }
            }
        }
    }

    Ok((name, version, "python", deps, Vec::new()))
}

fn parse_requirements(source: &str) -> Parsed {
    let mut deps = Vec::new();
    for line in source.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if let Some(included) = line.strip_prefix("-r").map(str::trim) {
            if !included.is_empty() {
                let mut dep = ManifestDep::new(included, "");
                dep.include = true;
                deps.push(dep);
            }
            continue;
        }
        if line.starts_with('-') {
            continue;
        }
        deps.push(split_requirement(line));
    }
    (String::new(), String::new(), "python", deps, Vec::new())
}

fn parse_setup_py(source: &str) -> Parsed {
    let name = scan_kwarg(source, "name");
    let version = scan_kwarg(source, "version");
    let mut deps = Vec::new();
    if let Some(start) = source.find("install_requires") {
        let rest = &source[start..];
        if let Some(open) = rest.find('[') {
            if let Some(close) = rest[open..].find(']') {
                let list = &rest[open + 1..open + close];
                for entry in list.split(',') {
                    let requirement = unquote(entry.trim());
                    if !requirement.is_empty() {
                        deps.push(split_requirement(&requirement));
                    }
                }
            }
        }
    }
    (name, version, "python", deps, Vec::new())
}

fn parse_package_json(path: &str, source: &str) -> Result<Parsed, ExtractError> {
    let value: serde_json::Value =
        serde_json::from_str(source).map_err(|e| ExtractError::Manifest {
            path: path.to_string(),
            message: e.to_string(),
        })?;
    let name = value
        .get("name")
        .and_then(|n| n.as_str())
        .unwrap_or("")
        .to_string();
    let version = value
        .get("version")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let mut deps = Vec::new();
    if let Some(table) = value.get("dependencies").and_then(|d| d.as_object()) {
        for (dep_name, spec) in table {
            deps.push(ManifestDep::new(dep_name, spec.as_str().unwrap_or("")));
        }
    }
    if let Some(table) = value.get("devDependencies").and_then(|d| d.as_object()) {
        for (dep_name, spec) in table {
            deps.push(ManifestDep::new(dep_name, spec.as_str().unwrap_or("")).dev());
        }
    }
    Ok((name, version, "nodejs", deps, Vec::new()))
}

fn parse_go_mod(source: &str) -> Parsed {
    let mut module = String::new();
    let mut deps = Vec::new();
    let mut in_require_block = false;
    for line in source.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("module ") {
            module = rest.trim().to_string();
            continue;
        }
        if line.starts_with("require (") {
            in_require_block = true;
            continue;
        }
        if in_require_block && line.starts_with(')') {
            in_require_block = false;
            continue;
        }
        let requirement = if in_require_block {
            line
        } else if let Some(rest) = line.strip_prefix("require ") {
            rest.trim()
        } else {
            continue;
        };
        if requirement.is_empty() || requirement.starts_with("//") {
            continue;
        }
        let indirect = requirement.contains("// indirect");
        let requirement = requirement.split("//").next().unwrap_or("").trim();
        let mut parts = requirement.split_whitespace();
        let (Some(dep_path), Some(dep_version)) = (parts.next(), parts.next()) else {
            continue;
        };
        let mut dep = ManifestDep::new(dep_path, dep_version);
        if indirect {
            dep.scope = "indirect".to_string();
        }
        deps.push(dep);
    }

    let service_name = module.rsplit('/').next().unwrap_or("").to_string();
    let extra = if module.is_empty() {
        Vec::new()
    } else {
        vec![("go_module".to_string(), module)]
    };
    (service_name, String::new(), "go", deps, extra)
}

/// Split `fastapi>=0.100.0` / `uvicorn[standard]==0.23` into name and
/// verbatim version spec.
fn split_requirement(requirement: &str) -> ManifestDep {
    let requirement = requirement.trim();
    let name_end = requirement
        .find(|c: char| "=<>!~[; ".contains(c))
        .unwrap_or(requirement.len());
    let name = &requirement[..name_end];
    let rest = &requirement[name_end..];
    let version = rest
        .trim_start_matches(|c: char| c == '[' || c == ']' || c.is_alphanumeric())
        .split(';')
        .next()
        .unwrap_or("")
        .trim();
    // Extras like [standard] are not part of the version spec.
    let version = if rest.starts_with('[') {
        rest.find(']')
            .map(|close| rest[close + 1..].split(';').next().unwrap_or("").trim())
            .unwrap_or("")
    } else {
        version
    };
    ManifestDep::new(name, version)
}

fn scan_kwarg(source: &str, key: &str) -> String {
    let needle = format!("{key}=");
    let Some(start) = source.find(&needle) else {
        return String::new();
    };
    let rest = source[start + needle.len()..].trim_start();
    if rest.starts_with('"') || rest.starts_with('\'') {
        let quote = rest.chars().next().unwrap_or('"');
        if let Some(end) = rest[1..].find(quote) {
            return rest[1..1 + end].to_string();
        }
    }
    String::new()
}

fn str_of(value: Option<&toml::Value>) -> String {
    value.and_then(|v| v.as_str()).unwrap_or("").to_string()
}

fn poetry_version(spec: &toml::Value) -> String {
    match spec {
        toml::Value::String(s) => s.clone(),
        toml::Value::Table(table) => str_of(table.get("version")),
        _ => String::new(),
    }
}
