//! JSON extraction robust to prose-wrapped model output.

/// Returns the first balanced `[ … ]` in the response, string- and
/// escape-aware, so surrounding prose or code fences don't matter.
pub fn extract_json_array(response: &str) -> Option<&str> {
    let bytes = response.as_bytes();
    let start = response.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
