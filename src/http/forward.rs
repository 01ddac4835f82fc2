//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Issue the single upstream round trip for a handler
//! - Same method as the inbound request; GET/HEAD carry no body, everything
//!   else streams the inbound body through unbuffered
//!
//! # Design Decisions
//! - The legacy hyper client never follows redirects, so upstream 3xx
//!   responses pass through opaquely instead of leaking credentials
//!   cross-origin
//! - Network failure is an explicit `UpstreamError`, giving each handler
//!   exactly one non-happy path

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

/// Shared HTTP client for upstream calls.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the client once at startup; connections are pooled across requests.
///
/// The connector accepts both https and plain-http origins, since
/// `resolve_origin` produces https by default but local deployments point at
/// plain-http upstreams.
pub fn build_client() -> UpstreamClient {
    let connector = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector)
}

/// The single upstream round trip failed.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream request could not be constructed.
    #[error("invalid upstream request: {0}")]
    Request(#[from] axum::http::Error),

    /// Network, DNS, or TLS failure reaching the upstream.
    #[error("upstream request failed: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),

    /// The upstream response body could not be read.
    #[error("upstream body read failed: {0}")]
    Body(#[from] axum::Error),
}

/// Forward a request to `url` with the prepared headers.
pub async fn forward(
    client: &UpstreamClient,
    method: Method,
    url: &str,
    headers: HeaderMap,
    body: Body,
) -> Result<Response<Incoming>, UpstreamError> {
    let body = if method == Method::GET || method == Method::HEAD {
        Body::empty()
    } else {
        body
    };

    let mut request = Request::builder().method(method).uri(url).body(body)?;
    *request.headers_mut() = headers;

    Ok(client.request(request).await?)
}
