//! Edge refresh-token proxy.
//!
//! Keeps a browser application's long-lived refresh credential in an
//! HttpOnly, path-scoped cookie at the edge and forwards exactly three
//! authentication operations to an upstream API origin:
//!
//! | Method    | Path                     | Purpose                         |
//! |-----------|--------------------------|---------------------------------|
//! | POST      | `/proxy/auth/refresh`    | exchange cookie for new tokens  |
//! | POST      | `/proxy/auth/logout`     | end session, clear edge cookie  |
//! | GET, POST | `/proxy/oauth/callback`  | OAuth code exchange, set cookie |
//!
//! Every other path under `/proxy` is a 404; everything outside the prefix
//! is served as static assets. The proxy is stateless between requests: the
//! auth configuration is recomputed from the environment on every call and
//! no cookie value is ever inspected, only relayed.

pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
