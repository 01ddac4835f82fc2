//! HTTP subsystem: server, middleware, handlers, and the cookie and
//! response rewriting machinery behind them.

pub mod cookie;
pub mod forward;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
