//! Observability: metrics exposition. Structured logging is initialized in
//! the binary via `tracing-subscriber`.

pub mod metrics;
