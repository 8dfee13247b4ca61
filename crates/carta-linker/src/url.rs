//! URL normalization and endpoint matching rules.

/// Canonical form a URL is reduced to before endpoint matching:
/// lowercased, trailing slash stripped, leading slash ensured, repeated
/// slashes collapsed, and `{x}` / `:x` / `<x>` path parameters replaced
/// by `*`. Idempotent.
pub fn normalize_url(path: &str) -> String {
    let lowered = path.trim().to_lowercase();
    let mut segments: Vec<String> = Vec::new();
    for segment in lowered.split('/') {
        if segment.is_empty() {
            continue;
        }
        let is_param = (segment.starts_with('{') && segment.ends_with('}'))
            || (segment.starts_with('<') && segment.ends_with('>'))
            || segment.starts_with(':');
        segments.push(if is_param {
            "*".to_string()
        } else {
            segment.to_string()
        });
    }
    format!("/{}", segments.join("/"))
}

/// Prefix + path join used when rewriting an endpoint's `full_path`:
/// collapse repeated slashes, ensure a leading slash. Case is preserved.
pub fn join_prefix(prefix: &str, path: &str) -> String {
    let combined = format!("{prefix}/{path}");
    let segments: Vec<&str> = combined.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Whether one normalized path is a whole-segment suffix of the other
/// (gateway prefixes drop segments from either side).
pub fn suffix_match(a: &str, b: &str) -> bool {
    let a_segments: Vec<&str> = a.split('/').filter(|s| !s.is_empty()).collect();
    let b_segments: Vec<&str> = b.split('/').filter(|s| !s.is_empty()).collect();
    if a_segments.is_empty() || b_segments.is_empty() {
        return false;
    }
    let (shorter, longer) = if a_segments.len() <= b_segments.len() {
        (&a_segments, &b_segments)
    } else {
        (&b_segments, &a_segments)
    };
    longer[longer.len() - shorter.len()..] == shorter[..]
}

/// Segment-wise comparison where `*` on either side matches anything;
/// both paths must have the same number of segments.
pub fn wildcard_match(a: &str, b: &str) -> bool {
    let a_segments: Vec<&str> = a.split('/').filter(|s| !s.is_empty()).collect();
    let b_segments: Vec<&str> = b.split('/').filter(|s| !s.is_empty()).collect();
    if a_segments.len() != b_segments.len() || a_segments.is_empty() {
        return false;
    }
    a_segments
        .iter()
        .zip(b_segments.iter())
        .all(|(x, y)| x == y || *x == "*" || *y == "*")
}
