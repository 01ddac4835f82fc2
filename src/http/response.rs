//! Upstream response rewriting.
//!
//! # Responsibilities
//! - Buffer the upstream body and strip the upstream's own Set-Cookie
//! - Re-emit the proxy's cookie: rotate, expire, or omit
//! - Merge `Cookie` into `Vary` and force `Cache-Control: no-store` on JSON
//!
//! # Design Decisions
//! - The upstream's 401 always expires the edge cookie, whichever handler is
//!   active
//! - The `Secure` attribute comes from the inbound transport via the
//!   configured policy, never from the upstream

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

use crate::config::schema::{CookieSecurityConfig, SecurePolicy};
use crate::http::cookie::{find_cookie_value, set_cookie_values, SetCookie};
use crate::http::forward::UpstreamError;

/// Per-request override for the cookie max-age, in seconds.
pub const MAX_AGE_HEADER: &str = "x-refresh-cookie-max-age";

/// Hop-by-hop headers that must not be copied through, plus Set-Cookie
/// (rewritten by the proxy) and Content-Length (recomputed for the buffered
/// body).
const SKIPPED_HEADERS: [HeaderName; 10] = [
    header::SET_COOKIE,
    header::CONTENT_LENGTH,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    HeaderName::from_static("keep-alive"),
];

/// How the proxy's own cookie is to be emitted for one response.
#[derive(Debug, Clone, Copy)]
pub struct CookiePlan<'a> {
    /// The proxy's cookie name (`rt-<app id>`).
    pub name: &'a str,
    /// Cookie path scope.
    pub path: &'a str,
    /// Effective max-age (configured default or per-request override).
    pub max_age: u32,
    /// The handler marked this call as session-ending.
    pub expire_session: bool,
    /// `Secure` attribute, derived from the inbound transport.
    pub secure: bool,
}

/// Rewrite an upstream response into the proxy's client-facing response.
pub async fn rewrite_upstream_response(
    upstream: Response<Body>,
    plan: CookiePlan<'_>,
    max_body_bytes: usize,
) -> Result<Response<Body>, UpstreamError> {
    let (parts, body) = upstream.into_parts();
    let bytes = axum::body::to_bytes(body, max_body_bytes).await?;

    let mut headers = HeaderMap::new();
    for (name, value) in parts.headers.iter() {
        if SKIPPED_HEADERS.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    // A response may carry several Vary headers; merge across all of them
    // so no token is dropped when the single combined value is re-emitted.
    let existing_vary = parts
        .headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ");
    let existing_vary = (!existing_vary.is_empty()).then_some(existing_vary.as_str());
    if let Ok(vary) = HeaderValue::from_str(&append_vary(existing_vary, "Cookie")) {
        headers.insert(header::VARY, vary);
    }

    let upstream_cookies = set_cookie_values(&parts.headers);
    let rotated = find_cookie_value(&upstream_cookies, plan.name);

    let emitted = if let Some(value) = rotated {
        Some(SetCookie {
            name: plan.name,
            value,
            max_age: Some(plan.max_age),
            path: Some(plan.path),
            same_site: Some("Lax"),
            secure: plan.secure,
        })
    } else if plan.expire_session || parts.status == StatusCode::UNAUTHORIZED {
        Some(expired_cookie(plan))
    } else {
        None
    };
    if let Some(cookie) = emitted {
        if let Ok(value) = HeaderValue::from_str(&cookie.serialize()) {
            headers.append(header::SET_COOKIE, value);
        }
    }

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if is_json && !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = parts.status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// An immediately-expiring cookie for the plan's name and path.
pub fn expired_cookie(plan: CookiePlan<'_>) -> SetCookie<'_> {
    SetCookie {
        name: plan.name,
        value: "",
        max_age: Some(0),
        path: Some(plan.path),
        same_site: Some("Lax"),
        secure: plan.secure,
    }
}

/// Merge `token` into an existing `Vary` value.
///
/// Case-insensitive de-duplication; existing tokens are preserved verbatim
/// and re-applying the merge is a no-op.
pub fn append_vary(existing: Option<&str>, token: &str) -> String {
    match existing {
        None | Some("") => token.to_string(),
        Some(existing) => {
            let already_present = existing
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token));
            if already_present {
                existing.to_string()
            } else {
                format!("{existing}, {token}")
            }
        }
    }
}

/// Effective cookie max-age: the inbound `X-Refresh-Cookie-Max-Age` header,
/// when a positive integer, overrides the configured default.
pub fn resolve_cookie_max_age(headers: &HeaderMap, default_max_age: u32) -> u32 {
    headers
        .get(MAX_AGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default_max_age)
}

/// Whether the refresh cookie should be `Secure` for this request, per the
/// configured policy.
pub fn request_is_secure(
    policy: &CookieSecurityConfig,
    listener_tls: bool,
    headers: &HeaderMap,
) -> bool {
    match policy.secure {
        SecurePolicy::Always => true,
        SecurePolicy::Never => false,
        SecurePolicy::Auto => {
            listener_tls
                || (policy.trust_forwarded_proto
                    && headers
                        .get("x-forwarded-proto")
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v.trim().eq_ignore_ascii_case("https")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CookieSecurityConfig;

    fn plan(expire: bool) -> CookiePlan<'static> {
        CookiePlan {
            name: "rt-demo",
            path: "/proxy/",
            max_age: 604_800,
            expire_session: expire,
            secure: true,
        }
    }

    fn upstream(status: StatusCode, headers: &[(&str, &str)], body: &str) -> Response<Body> {
        let mut response = Response::new(Body::from(body.to_string()));
        *response.status_mut() = status;
        for (name, value) in headers {
            response.headers_mut().append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        response
    }

    #[test]
    fn test_append_vary() {
        assert_eq!(append_vary(None, "Cookie"), "Cookie");
        assert_eq!(append_vary(Some("Accept"), "Cookie"), "Accept, Cookie");
        assert_eq!(
            append_vary(Some("Accept, Cookie"), "Cookie"),
            "Accept, Cookie"
        );
        assert_eq!(append_vary(Some("accept, cookie"), "Cookie"), "accept, cookie");
    }

    #[test]
    fn test_resolve_cookie_max_age() {
        let mut headers = HeaderMap::new();
        assert_eq!(resolve_cookie_max_age(&headers, 604_800), 604_800);

        headers.insert(MAX_AGE_HEADER, HeaderValue::from_static("3600"));
        assert_eq!(resolve_cookie_max_age(&headers, 604_800), 3600);

        headers.insert(MAX_AGE_HEADER, HeaderValue::from_static("0"));
        assert_eq!(resolve_cookie_max_age(&headers, 604_800), 604_800);

        headers.insert(MAX_AGE_HEADER, HeaderValue::from_static("soon"));
        assert_eq!(resolve_cookie_max_age(&headers, 604_800), 604_800);
    }

    #[test]
    fn test_secure_policy_matrix() {
        let auto = CookieSecurityConfig::default();
        let empty = HeaderMap::new();
        assert!(!request_is_secure(&auto, false, &empty));
        assert!(request_is_secure(&auto, true, &empty));

        let mut forwarded = HeaderMap::new();
        forwarded.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert!(request_is_secure(&auto, false, &forwarded));

        let untrusting = CookieSecurityConfig {
            trust_forwarded_proto: false,
            ..CookieSecurityConfig::default()
        };
        assert!(!request_is_secure(&untrusting, false, &forwarded));

        let always = CookieSecurityConfig {
            secure: SecurePolicy::Always,
            ..CookieSecurityConfig::default()
        };
        assert!(request_is_secure(&always, false, &empty));

        let never = CookieSecurityConfig {
            secure: SecurePolicy::Never,
            ..CookieSecurityConfig::default()
        };
        assert!(!request_is_secure(&never, true, &forwarded));
    }

    #[tokio::test]
    async fn test_rotation_reissues_under_proxy_attributes() {
        let upstream = upstream(
            StatusCode::OK,
            &[("set-cookie", "rt-demo=new456; Path=/; HttpOnly")],
            "{}",
        );
        let response = rewrite_upstream_response(upstream, plan(false), 1024)
            .await
            .unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(
            cookie,
            "rt-demo=new456; HttpOnly; Secure; SameSite=Lax; Path=/proxy/; Max-Age=604800"
        );
    }

    #[tokio::test]
    async fn test_unauthorized_expires_cookie() {
        let upstream = upstream(StatusCode::UNAUTHORIZED, &[], "denied");
        let response = rewrite_upstream_response(upstream, plan(false), 1024)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("rt-demo="));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[tokio::test]
    async fn test_session_end_expires_even_on_success() {
        let upstream = upstream(StatusCode::OK, &[], "bye");
        let response = rewrite_upstream_response(upstream, plan(true), 1024)
            .await
            .unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_no_cookie_emitted_otherwise() {
        let upstream = upstream(StatusCode::OK, &[], "ok");
        let response = rewrite_upstream_response(upstream, plan(false), 1024)
            .await
            .unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_upstream_set_cookie_is_stripped() {
        let upstream = upstream(
            StatusCode::OK,
            &[("set-cookie", "unrelated=1; Path=/")],
            "ok",
        );
        let response = rewrite_upstream_response(upstream, plan(false), 1024)
            .await
            .unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_vary_merge_and_json_cache_control() {
        let upstream = upstream(
            StatusCode::OK,
            &[
                ("vary", "Accept"),
                ("content-type", "application/json; charset=utf-8"),
            ],
            "{}",
        );
        let response = rewrite_upstream_response(upstream, plan(false), 1024)
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::VARY).unwrap(),
            "Accept, Cookie"
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }

    #[tokio::test]
    async fn test_vary_merge_spans_multiple_headers() {
        let upstream = upstream(
            StatusCode::OK,
            &[("vary", "Accept"), ("vary", "Origin")],
            "ok",
        );
        let response = rewrite_upstream_response(upstream, plan(false), 1024)
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::VARY).unwrap(),
            "Accept, Origin, Cookie"
        );
    }

    #[tokio::test]
    async fn test_existing_cache_control_is_preserved() {
        let upstream = upstream(
            StatusCode::OK,
            &[
                ("content-type", "application/json"),
                ("cache-control", "max-age=60"),
            ],
            "{}",
        );
        let response = rewrite_upstream_response(upstream, plan(false), 1024)
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "max-age=60"
        );
    }
}
