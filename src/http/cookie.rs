//! Cookie parsing and serialization.
//!
//! # Responsibilities
//! - Parse inbound `Cookie` headers into name/value pairs
//! - Scan upstream `Set-Cookie` entries for a named value
//! - Serialize the proxy's own `Set-Cookie` with fixed security attributes
//!
//! # Design Decisions
//! - Attribute order is fixed so responses are byte-stable across calls
//! - `Max-Age=0` always carries a past `Expires` as well, for clients that
//!   ignore Max-Age

use std::collections::HashMap;

use axum::http::{header, HeaderMap};

/// Past timestamp paired with `Max-Age=0` when expiring a cookie.
const EXPIRED_AT: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Parse a `Cookie` header into a name → value map.
///
/// Splits on `;`, then each segment on the first `=`; the value keeps any
/// later `=` characters. Malformed or empty segments are skipped, and later
/// duplicates overwrite earlier ones.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for segment in header.split(';') {
        let segment = segment.trim();
        if let Some((name, value)) = segment.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
    }
    cookies
}

/// All raw `Set-Cookie` values carried by a header set, in order.
pub fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(ToString::to_string)
        .collect()
}

/// Find the value for `name` across raw `Set-Cookie` strings.
///
/// Each raw string's `;`-delimited segments are scanned for a `name=` match;
/// the first match across the sequence wins.
pub fn find_cookie_value<'a>(set_cookies: &'a [String], name: &str) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }
    for raw in set_cookies {
        for segment in raw.split(';') {
            let segment = segment.trim();
            if let Some(value) = segment.strip_prefix(name) {
                if let Some(value) = value.strip_prefix('=') {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// A `Set-Cookie` value to be emitted by the proxy.
#[derive(Debug, Clone)]
pub struct SetCookie<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub max_age: Option<u32>,
    pub path: Option<&'a str>,
    pub same_site: Option<&'a str>,
    pub secure: bool,
}

impl SetCookie<'_> {
    /// Serialize with the fixed attribute order: `name=value`, `HttpOnly`,
    /// `Secure`, `SameSite`, `Path`, `Max-Age`, and `Expires` (only when
    /// `max_age` is zero).
    pub fn serialize(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];
        parts.push("HttpOnly".to_string());
        if self.secure {
            parts.push("Secure".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={same_site}"));
        }
        if let Some(path) = self.path {
            parts.push(format!("Path={path}"));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={max_age}"));
            if max_age == 0 {
                parts.push(format!("Expires={EXPIRED_AT}"));
            }
        }
        parts.join("; ")
    }
}
