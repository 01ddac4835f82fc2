//! Error taxonomy for the proxy.
//!
//! Every variant maps to a well-formed HTTP response; no failure propagates
//! past the proxy boundary and nothing is retried internally.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::env::MissingConfig;
use crate::http::forward::UpstreamError;

/// Failures a handler can surface to the client.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Required environment-derived configuration is absent; no upstream
    /// call was attempted.
    #[error("proxy not configured, missing: {0}")]
    NotConfigured(MissingConfig),

    /// Method not allowed on this endpoint; no upstream call was attempted.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The single upstream round trip failed at the network level.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::NotConfigured(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Proxy not configured").into_response()
            }
            ProxyError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
            }
            ProxyError::Upstream(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream error").into_response()
            }
        }
    }
}
