//! Auth endpoint handlers.
//!
//! # Responsibilities
//! - Enforce per-endpoint method rules (405 on mismatch)
//! - Fail fast on incomplete configuration (500, no upstream call)
//! - Build the upstream URL and per-handler header set, forward, rewrite
//!
//! # Forwarding policy
//! - refresh: only the named refresh cookie, never Authorization
//! - logout: full Cookie header plus Authorization; always ends the session
//!   at the edge, even when the upstream is unreachable
//! - oauth callback: full Cookie header, full query string, forced `appId`

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use url::form_urlencoded;

use crate::config::env::AuthConfig;
use crate::config::origin::ensure_trailing_slash;
use crate::error::ProxyError;
use crate::http::cookie::parse_cookies;
use crate::http::forward::forward;
use crate::http::response::{
    expired_cookie, request_is_secure, resolve_cookie_max_age, rewrite_upstream_response,
    CookiePlan,
};
use crate::http::server::AppState;
use crate::observability::metrics;

/// POST /proxy/auth/refresh: exchange the refresh cookie for new tokens.
pub async fn refresh(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = handle_refresh(&state, request).await.unwrap_or_else(|e| {
        tracing::error!(handler = "refresh", error = %e, "request failed");
        e.into_response()
    });
    metrics::record_request(&method, response.status().as_u16(), "refresh", start);
    response
}

/// POST /proxy/auth/logout: end the upstream session, always clear the
/// edge cookie.
pub async fn logout(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = handle_logout(&state, request).await.unwrap_or_else(|e| {
        tracing::error!(handler = "logout", error = %e, "request failed");
        e.into_response()
    });
    metrics::record_request(&method, response.status().as_u16(), "logout", start);
    response
}

/// GET/POST /proxy/oauth/callback: complete the OAuth code exchange and
/// set the initial cookie.
pub async fn oauth_callback(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = handle_oauth_callback(&state, request)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(handler = "oauth_callback", error = %e, "request failed");
            e.into_response()
        });
    metrics::record_request(&method, response.status().as_u16(), "oauth_callback", start);
    response
}

/// Any path under the proxy prefix that matches no endpoint.
pub async fn prefix_not_found(request: Request<Body>) -> Response {
    let start = Instant::now();
    tracing::warn!(path = %request.uri().path(), "no proxy route matched");
    let method = request.method().to_string();
    let response = (StatusCode::NOT_FOUND, "Not Found").into_response();
    metrics::record_request(&method, 404, "not_found", start);
    response
}

async fn handle_refresh(
    state: &AppState,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    if request.method() != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let auth = AuthConfig::load(state.env.as_ref());
    let cfg = auth.ready().map_err(ProxyError::NotConfigured)?;

    let plan = CookiePlan {
        name: cfg.cookie_name,
        path: cfg.cookie_path,
        max_age: resolve_cookie_max_age(request.headers(), cfg.cookie_max_age),
        expire_session: false,
        secure: request_is_secure(
            &state.config.cookie_security,
            state.listener_tls,
            request.headers(),
        ),
    };

    let mut upstream_headers = json_headers();
    // The refresh cookie is the sole credential: re-serialize just that one
    // cookie and never forward Authorization.
    let cookies = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(parse_cookies)
        .unwrap_or_default();
    if let Some(value) = cookies.get(cfg.cookie_name) {
        if let Ok(value) = HeaderValue::from_str(&format!("{}={value}", cfg.cookie_name)) {
            upstream_headers.insert(header::COOKIE, value);
        }
    }

    let url = build_upstream_url(cfg.api_origin, cfg.app_id, "auth/refresh");
    let (parts, body) = request.into_parts();
    let upstream = forward(&state.client, parts.method, &url, upstream_headers, body).await?;
    let response = rewrite_upstream_response(
        upstream.map(Body::new),
        plan,
        state.config.limits.max_body_bytes,
    )
    .await?;
    Ok(response)
}

async fn handle_logout(
    state: &AppState,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    if request.method() != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let auth = AuthConfig::load(state.env.as_ref());
    let cfg = auth.ready().map_err(ProxyError::NotConfigured)?;

    let plan = CookiePlan {
        name: cfg.cookie_name,
        path: cfg.cookie_path,
        max_age: resolve_cookie_max_age(request.headers(), cfg.cookie_max_age),
        expire_session: true,
        secure: request_is_secure(
            &state.config.cookie_security,
            state.listener_tls,
            request.headers(),
        ),
    };

    let mut upstream_headers = json_headers();
    if let Some(cookie) = request.headers().get(header::COOKIE) {
        upstream_headers.insert(header::COOKIE, cookie.clone());
    }
    if let Some(authorization) = request.headers().get(header::AUTHORIZATION) {
        upstream_headers.insert(header::AUTHORIZATION, authorization.clone());
    }

    let url = build_upstream_url(cfg.api_origin, cfg.app_id, "auth/logout");
    let (parts, body) = request.into_parts();

    let upstream = match forward(&state.client, parts.method, &url, upstream_headers, body).await
    {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::error!(handler = "logout", error = %e, "upstream error");
            return Ok(logout_failure_response(plan));
        }
    };
    match rewrite_upstream_response(
        upstream.map(Body::new),
        plan,
        state.config.limits.max_body_bytes,
    )
    .await
    {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::error!(handler = "logout", error = %e, "upstream error");
            Ok(logout_failure_response(plan))
        }
    }
}

async fn handle_oauth_callback(
    state: &AppState,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    if request.method() != Method::GET && request.method() != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let auth = AuthConfig::load(state.env.as_ref());
    let cfg = auth.ready().map_err(ProxyError::NotConfigured)?;

    let plan = CookiePlan {
        name: cfg.cookie_name,
        path: cfg.cookie_path,
        max_age: resolve_cookie_max_age(request.headers(), cfg.cookie_max_age),
        expire_session: false,
        secure: request_is_secure(
            &state.config.cookie_security,
            state.listener_tls,
            request.headers(),
        ),
    };

    let mut upstream_headers = HeaderMap::new();
    upstream_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(cookie) = request.headers().get(header::COOKIE) {
        upstream_headers.insert(header::COOKIE, cookie.clone());
    }

    let url = oauth_callback_url(cfg.api_origin, cfg.app_id, request.uri().query());
    let (parts, body) = request.into_parts();
    let upstream = forward(&state.client, parts.method, &url, upstream_headers, body).await?;
    let response = rewrite_upstream_response(
        upstream.map(Body::new),
        plan,
        state.config.limits.max_body_bytes,
    )
    .await?;
    Ok(response)
}

/// Local session teardown when the upstream cannot be reached: 502 with a
/// JSON error body and a forced cookie expiry.
fn logout_failure_response(plan: CookiePlan<'_>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Ok(value) = HeaderValue::from_str(&expired_cookie(plan).serialize()) {
        headers.append(header::SET_COOKIE, value);
    }

    let body = serde_json::json!({ "error": "Upstream logout failed" }).to_string();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    *response.headers_mut() = headers;
    response
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// `origin/app/<appId>/api/<endpoint>`.
fn build_upstream_url(origin: &str, app_id: &str, endpoint: &str) -> String {
    format!(
        "{}app/{}/api/{}",
        ensure_trailing_slash(origin),
        app_id,
        endpoint.trim_start_matches('/')
    )
}

/// The oauth callback URL carries the full inbound query, with `appId`
/// force-set when the caller omitted it.
fn oauth_callback_url(origin: &str, app_id: &str, query: Option<&str>) -> String {
    let mut url = build_upstream_url(origin, app_id, "oauth/callback");

    let has_app_id = query.is_some_and(|q| {
        form_urlencoded::parse(q.as_bytes()).any(|(name, _)| name == "appId")
    });
    let encoded_app_id: String = form_urlencoded::byte_serialize(app_id.as_bytes()).collect();

    match query.filter(|q| !q.is_empty()) {
        Some(q) => {
            url.push('?');
            url.push_str(q);
            if !has_app_id {
                url.push_str(&format!("&appId={encoded_app_id}"));
            }
        }
        None => {
            url.push_str(&format!("?appId={encoded_app_id}"));
        }
    }
    url
}
