//! URL composition helpers.
//!
//! Plain string manipulation: the host resolves and validates URLs, Tether
//! only assembles them.

use serde_json::Value;

/// Whether `url` carries a scheme (`scheme://`) or is protocol-relative (`//`).
pub fn is_absolute(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some(idx) = url.find("://") else {
        return false;
    };
    let scheme = &url[..idx];
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Join two URL parts with exactly one `/`. Empty if either part is empty.
pub fn combine(base: &str, relative: &str) -> String {
    if base.is_empty() || relative.is_empty() {
        return String::new();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Resolve `url` against `base`.
///
/// Absolute URLs pass through untouched. Otherwise an empty `base` yields
/// an empty string and an empty `url` yields `base`.
pub fn build_full_path(base: &str, url: &str) -> String {
    if is_absolute(url) {
        return url.to_string();
    }
    if base.is_empty() {
        return String::new();
    }
    if url.is_empty() {
        return base.to_string();
    }
    combine(base, url)
}

/// Apply `params` to `url`.
///
/// A mapping is appended as `k=v` pairs; the first separator is `&` when
/// `url` already contains `=`, else `?`. Keys and values go out as given,
/// percent-encoding is left to the caller. Null entries are skipped, nested
/// values are sent as JSON text. A string or number is joined as a path
/// segment instead.
pub fn build_path_param(url: &str, params: &Value) -> String {
    match params {
        Value::Object(map) => {
            let query = map
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| format!("{}={}", key, param_value(value)))
                .collect::<Vec<_>>()
                .join("&");
            if query.is_empty() {
                return url.to_string();
            }

            let separator = if url.contains('=') { '&' } else { '?' };
            format!("{}{}{}", url, separator, query)
        }
        Value::String(segment) if !segment.is_empty() => combine(url, segment),
        Value::Number(n) => combine(url, &n.to_string()),
        _ => url.to_string(),
    }
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("https://a.com"));
        assert!(is_absolute("wss://a.com/socket"));
        assert!(is_absolute("//cdn.a.com/x.js"));
        assert!(is_absolute("custom+scheme.v1://x"));
        assert!(!is_absolute("/api/users"));
        assert!(!is_absolute("api/users?next=http://x"));
        assert!(!is_absolute("1http://x"));
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine("https://a.com/", "/b/c"), "https://a.com/b/c");
        assert_eq!(combine("https://a.com///", "b"), "https://a.com/b");
        assert_eq!(combine("", "b"), "");
        assert_eq!(combine("a", ""), "");
    }

    #[test]
    fn test_build_full_path() {
        assert_eq!(build_full_path("https://a.com/", "/b/c"), "https://a.com/b/c");
        assert_eq!(
            build_full_path("https://a.com", "http://other.com/x"),
            "http://other.com/x"
        );
        assert_eq!(build_full_path("https://a.com", ""), "https://a.com");
        assert_eq!(build_full_path("", "/b"), "");
        assert_eq!(build_full_path("", "https://x.com/b"), "https://x.com/b");
    }

    #[test]
    fn test_build_path_param_query() {
        assert_eq!(build_path_param("/a/b", &json!({"x": 1, "y": 2})), "/a/b?x=1&y=2");
        assert_eq!(
            build_path_param("/a/b?x=1", &json!({"y": "two"})),
            "/a/b?x=1&y=two"
        );
    }

    #[test]
    fn test_build_path_param_skips_null_and_keeps_values_verbatim() {
        assert_eq!(
            build_path_param("/s", &json!({"q": "a%20b", "r": "x y", "skip": null})),
            "/s?q=a%20b&r=x y"
        );
        assert_eq!(
            build_path_param("/s", &json!({"f": {"a": [1]}})),
            r#"/s?f={"a":[1]}"#
        );
        assert_eq!(build_path_param("/s", &json!({"skip": null})), "/s");
        assert_eq!(build_path_param("/s", &json!({})), "/s");
    }

    #[test]
    fn test_build_path_param_segment() {
        assert_eq!(build_path_param("/users/", &json!("42")), "/users/42");
        assert_eq!(build_path_param("/users", &json!(7)), "/users/7");
        assert_eq!(build_path_param("/users", &Value::Null), "/users");
        assert_eq!(build_path_param("/users", &json!("")), "/users");
    }
}
