//! Test-entity naming conventions, per language.
//!
//! Used by the extractors to type File/TestFile and Function/TestFunction
//! nodes, and by the linker's coverage phase to derive candidate source
//! files and source symbol names from a test's name.

use carta_core::Language;

use crate::strings::{basename, dirname, lower_first, stem};

const GO_TEST_PREFIXES: [&str; 4] = ["Test", "Benchmark", "Example", "Fuzz"];

/// Whether `path` matches the language's test-file naming convention.
pub fn is_test_file(language: Language, path: &str) -> bool {
    let base = basename(path);
    match language {
        Language::Go => base.ends_with("_test.go"),
        Language::Python => {
            base.ends_with(".py") && (base.starts_with("test_") || base.ends_with("_test.py"))
        }
        Language::TypeScript | Language::JavaScript => {
            ["ts", "tsx", "js", "jsx"].iter().any(|ext| {
                base.ends_with(&format!(".test.{ext}")) || base.ends_with(&format!(".spec.{ext}"))
            })
        }
        Language::Java => {
            let s = stem(path);
            s.ends_with("Test") || s.ends_with("Tests") || s.ends_with("IT") || s.starts_with("Test")
        }
        Language::Rust => path.split('/').any(|seg| seg == "tests"),
        Language::CSharp => {
            let s = stem(path);
            s.ends_with("Test") || s.ends_with("Tests") || s.starts_with("Test")
        }
        Language::Unknown => false,
    }
}

/// Whether a function named `name`, declared inside a test file, is a
/// test function. (Outside test files nothing is a test function.)
pub fn is_test_function(language: Language, name: &str) -> bool {
    match language {
        Language::Go => GO_TEST_PREFIXES
            .iter()
            .any(|p| name.starts_with(p) && name.len() > p.len()),
        Language::Python | Language::Rust => name.starts_with("test_"),
        // Any function declared in a .test./.spec. file counts.
        Language::TypeScript | Language::JavaScript => true,
        Language::Java => name.starts_with("test"),
        Language::CSharp => name.starts_with("Test"),
        Language::Unknown => false,
    }
}

/// Candidate paths of the source file a test file covers, most specific
/// first. All candidates live in the same directory except the Rust
/// integration-test convention, which also tries `../src/<name>.rs`.
pub fn candidate_source_files(language: Language, path: &str) -> Vec<String> {
    let dir = dirname(path);
    let base = basename(path);
    let join = |dir: &str, name: &str| {
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        }
    };
    let mut out = Vec::new();
    match language {
        Language::Go => {
            if let Some(name) = base.strip_suffix("_test.go") {
                out.push(join(dir, &format!("{name}.go")));
            }
        }
        Language::Python => {
            if let Some(name) = base.strip_prefix("test_") {
                out.push(join(dir, name));
            }
            if let Some(name) = base.strip_suffix("_test.py") {
                out.push(join(dir, &format!("{name}.py")));
            }
        }
        Language::TypeScript | Language::JavaScript => {
            for marker in [".test.", ".spec."] {
                if base.contains(marker) {
                    out.push(join(dir, &base.replacen(marker, ".", 1)));
                }
            }
        }
        Language::Java | Language::CSharp => {
            let ext = if language == Language::Java { "java" } else { "cs" };
            let s = stem(path);
            for suffix in ["Tests", "Test", "IT"] {
                if language == Language::CSharp && suffix == "IT" {
                    continue;
                }
                if let Some(name) = s.strip_suffix(suffix) {
                    if !name.is_empty() {
                        out.push(join(dir, &format!("{name}.{ext}")));
                    }
                }
            }
            if let Some(name) = s.strip_prefix("Test") {
                if !name.is_empty() {
                    out.push(join(dir, &format!("{name}.{ext}")));
                }
            }
        }
        Language::Rust => {
            let s = stem(path);
            let name = s.strip_prefix("test_").unwrap_or(s);
            out.push(join(dir, &format!("{name}.rs")));
            // tests/foo.rs conventionally exercises src/foo.rs
            if let Some(parent) = dir.strip_suffix("tests") {
                let parent = parent.trim_end_matches('/');
                out.push(join(parent, &format!("src/{name}.rs")));
            }
        }
        Language::Unknown => {}
    }
    out.dedup();
    out
}

/// Candidate names of the source symbol a test function covers, most
/// specific first. Go composite names split on `_` into receiver,
/// method, and `Receiver.Method`; Java/C# get a camelCase variant.
pub fn candidate_source_names(language: Language, name: &str) -> Vec<String> {
    let mut out = Vec::new();
    match language {
        Language::Go => {
            for prefix in GO_TEST_PREFIXES {
                if let Some(rest) = name.strip_prefix(prefix) {
                    if rest.is_empty() {
                        continue;
                    }
                    out.push(rest.to_string());
                    if let Some((receiver, method)) = rest.split_once('_') {
                        if !receiver.is_empty() && !method.is_empty() {
                            out.push(receiver.to_string());
                            out.push(method.to_string());
                            out.push(format!("{receiver}.{method}"));
                        }
                    }
                    break;
                }
            }
        }
        Language::Python | Language::Rust => {
            if let Some(rest) = name.strip_prefix("test_") {
                if !rest.is_empty() {
                    out.push(rest.to_string());
                }
            }
        }
        Language::Java => {
            if let Some(rest) = name.strip_prefix("test") {
                if !rest.is_empty() {
                    out.push(rest.to_string());
                    out.push(lower_first(rest));
                }
            }
        }
        Language::CSharp => {
            if let Some(rest) = name.strip_prefix("Test") {
                if !rest.is_empty() {
                    out.push(rest.to_string());
                    out.push(lower_first(rest));
                }
            }
        }
        Language::TypeScript | Language::JavaScript => {
            out.push(name.to_string());
        }
        Language::Unknown => {}
    }
    out.dedup();
    out
}
