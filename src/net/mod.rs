//! Network-level concerns for the listener.

pub mod tls;
