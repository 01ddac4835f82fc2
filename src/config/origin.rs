//! Upstream origin resolution.
//!
//! # Responsibilities
//! - Normalize operator-supplied origin strings into a canonical origin
//! - Accept full URLs, bare hostnames, and references relative to a base
//!
//! # Design Decisions
//! - Opaque origins (non-hierarchical URLs) are treated as a failure
//! - Path-absolute values (`/api`) skip the https-prefix step and resolve
//!   against the fallback base only

use url::{Origin, Url};

/// Resolve a configured value into a canonical origin string
/// (`scheme://host[:port]`, default ports omitted).
///
/// Tries, in order, returning on first success:
/// 1. parse as an absolute URL and take its origin;
/// 2. if the value has no scheme separator and is not path-absolute, prefix
///    `https://` and retry;
/// 3. resolve the value as a reference relative to `fallback_base` (with a
///    guaranteed trailing slash) and take that origin.
pub fn resolve_origin(value: &str, fallback_base: Option<&str>) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(origin) = parse_origin(trimmed) {
        return Some(origin);
    }

    if !trimmed.contains("://") && !trimmed.starts_with('/') {
        let candidate = format!("https://{}", trimmed.trim_start_matches('/'));
        if let Some(origin) = parse_origin(&candidate) {
            return Some(origin);
        }
    }

    if let Some(base) = fallback_base {
        if let Some(base_origin) = parse_origin(base.trim()) {
            if let Ok(base_url) = Url::parse(&ensure_trailing_slash(&base_origin)) {
                if let Ok(joined) = base_url.join(trimmed) {
                    return match joined.origin() {
                        Origin::Tuple(..) => Some(joined.origin().ascii_serialization()),
                        Origin::Opaque(_) => None,
                    };
                }
            }
        }
    }

    None
}

/// Append a trailing `/` unless one is already present.
pub fn ensure_trailing_slash(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    }
}

fn parse_origin(candidate: &str) -> Option<String> {
    let url = Url::parse(candidate).ok()?;
    match url.origin() {
        Origin::Tuple(..) => Some(url.origin().ascii_serialization()),
        Origin::Opaque(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_yields_its_origin() {
        assert_eq!(
            resolve_origin("https://api.example.com/v2/tokens?x=1", None),
            Some("https://api.example.com".to_string())
        );
        assert_eq!(
            resolve_origin("http://127.0.0.1:3000/health", None),
            Some("http://127.0.0.1:3000".to_string())
        );
    }

    #[test]
    fn test_default_port_is_omitted() {
        assert_eq!(
            resolve_origin("https://api.example.com:443/", None),
            Some("https://api.example.com".to_string())
        );
        assert_eq!(
            resolve_origin("https://api.example.com:8443/", None),
            Some("https://api.example.com:8443".to_string())
        );
    }

    #[test]
    fn test_bare_hostname_gets_https() {
        assert_eq!(
            resolve_origin("example.com", None),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            resolve_origin("api.example.com/some/path", None),
            Some("https://api.example.com".to_string())
        );
    }

    #[test]
    fn test_path_resolves_against_fallback_base() {
        assert_eq!(
            resolve_origin("/api", Some("https://base.com/x/")),
            Some("https://base.com".to_string())
        );
    }

    #[test]
    fn test_garbage_is_absent() {
        assert_eq!(resolve_origin("not a url", None), None);
        assert_eq!(resolve_origin("", None), None);
        assert_eq!(resolve_origin("   ", Some("also not a url")), None);
    }

    #[test]
    fn test_ensure_trailing_slash() {
        assert_eq!(ensure_trailing_slash("https://a.com"), "https://a.com/");
        assert_eq!(ensure_trailing_slash("https://a.com/"), "https://a.com/");
    }
}
