//! Runtime configuration schema.
//!
//! This module defines the startup configuration for the proxy process
//! (listener, timeouts, static assets, limits, cookie security policy,
//! observability). All types derive Serde traits for deserialization from a
//! TOML file. The per-request auth configuration lives in
//! [`crate::config::env`] and is environment-derived instead.

use serde::{Deserialize, Serialize};

/// Root runtime configuration for the proxy process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Static asset serving for paths outside the proxy prefix.
    pub static_assets: StaticAssetsConfig,

    /// Hard limits on buffered data.
    pub limits: LimitsConfig,

    /// Policy for the refresh cookie's `Secure` attribute.
    pub cookie_security: CookieSecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Static asset serving configuration.
///
/// Every path outside the proxy prefix is delegated here; the proxy itself
/// handles only the three auth endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticAssetsConfig {
    /// Directory to serve static files from.
    pub dir: String,
}

impl Default for StaticAssetsConfig {
    fn default() -> Self {
        Self {
            dir: "./dist".to_string(),
        }
    }
}

/// Hard limits on buffered data.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upstream response body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// When to mark the refresh cookie `Secure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecurePolicy {
    /// Derive from the inbound transport (listener TLS or, when trusted,
    /// `X-Forwarded-Proto: https`).
    #[default]
    Auto,
    /// Always `Secure`, e.g. when a terminating layer in front always
    /// speaks HTTPS to clients.
    Always,
    /// Never `Secure` (local development over plain HTTP).
    Never,
}

/// Policy for the refresh cookie's `Secure` attribute.
///
/// The reference behavior derives `Secure` from the inbound request's own
/// transport, which is ambiguous behind a TLS-terminating layer delivering
/// plaintext; this makes the choice explicit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieSecurityConfig {
    /// Secure-attribute policy.
    pub secure: SecurePolicy,

    /// Under `auto`, honor an `X-Forwarded-Proto: https` header from a
    /// fronting layer.
    pub trust_forwarded_proto: bool,
}

impl Default for CookieSecurityConfig {
    fn default() -> Self {
        Self {
            secure: SecurePolicy::Auto,
            trust_forwarded_proto: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
