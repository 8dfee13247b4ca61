//! Small string utilities shared by the extractors.

/// Strip one layer of matching string delimiters (quotes, backticks,
/// Go raw-string backquotes, Python triple quotes).
pub fn unquote(raw: &str) -> String {
    let s = raw.trim();
    for triple in ["\"\"\"", "'''"] {
        if s.len() >= 6 && s.starts_with(triple) && s.ends_with(triple) {
            return s[3..s.len() - 3].to_string();
        }
    }
    for quote in ['"', '\'', '`'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Reduce a URL to its path component: `http://svc/api/x?q=1` → `/api/x`.
/// Strings that are already paths pass through unchanged (minus query).
pub fn url_path(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    if let Some(scheme_end) = without_query.find("://") {
        let rest = &without_query[scheme_end + 3..];
        match rest.find('/') {
            Some(slash) => rest[slash..].to_string(),
            None => "/".to_string(),
        }
    } else {
        without_query.to_string()
    }
}

/// Path (no extension) → final segment. `"a/b/c.go"` → `"c.go"`.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory part of a repo-relative path; `""` for root-level files.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// File stem: basename with the final extension removed.
pub fn stem(path: &str) -> &str {
    let base = basename(path);
    match base.rfind('.') {
        Some(idx) => &base[..idx],
        None => base,
    }
}

/// Lowercase the first character (camelCase variants of stripped
/// test-method names).
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"/api/v1\""), "/api/v1");
        assert_eq!(unquote("'/x'"), "/x");
        assert_eq!(unquote("`raw`"), "raw");
        assert_eq!(unquote("\"\"\"doc\"\"\""), "doc");
        assert_eq!(unquote("bare"), "bare");
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("http://users-svc/api/v1/users?limit=5"), "/api/v1/users");
        assert_eq!(url_path("https://example.com"), "/");
        assert_eq!(url_path("/api/v1/users"), "/api/v1/users");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(basename("a/b/c.go"), "c.go");
        assert_eq!(dirname("a/b/c.go"), "a/b");
        assert_eq!(dirname("c.go"), "");
        assert_eq!(stem("a/b/user_test.go"), "user_test");
        assert_eq!(lower_first("CreateUser"), "createUser");
    }
}
