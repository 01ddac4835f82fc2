//! Configuration subsystem.
//!
//! Two layers with different lifetimes:
//! - [`schema::ServerConfig`]: process-wide runtime settings, loaded once at
//!   startup from TOML;
//! - [`env::AuthConfig`]: auth/cookie settings, recomputed from the
//!   environment on every proxied request.

pub mod env;
pub mod loader;
pub mod origin;
pub mod schema;
pub mod validation;

pub use env::{AuthConfig, EnvSource, ProcessEnv, PROXY_PREFIX};
pub use loader::{load_config, ConfigError};
pub use schema::{CookieSecurityConfig, ListenerConfig, SecurePolicy, ServerConfig, TlsConfig};
