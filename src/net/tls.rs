//! TLS configuration and certificate loading for the inbound listener.
//!
//! Inbound TLS matters here beyond transport security: under the `auto`
//! cookie-security policy, terminating TLS on this listener is what makes
//! the refresh cookie `Secure`.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Load TLS configuration from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {cert_path:?}"),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {key_path:?}"),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
