//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum Router: exact auth routes under the proxy prefix, a
//!   404 for everything else under the prefix, and static-asset fallback
//!   for paths outside it
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve plain HTTP or TLS depending on the listener configuration
//!
//! # Design Decisions
//! - Routes are bound with `any()` so each handler enforces its own method
//!   rules (405 with a body, matching the reference behavior)
//! - No shared mutable state: `AppState` carries only immutable runtime
//!   config, the pooled upstream client, and the environment source

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::env::{EnvSource, ProcessEnv, PROXY_PREFIX};
use crate::config::schema::ServerConfig;
use crate::http::forward::{build_client, UpstreamClient};
use crate::http::handlers;
use crate::http::request::RequestIdLayer;
use crate::net::tls::load_tls_config;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide runtime configuration.
    pub config: Arc<ServerConfig>,
    /// Pooled upstream HTTP client.
    pub client: UpstreamClient,
    /// Environment source for per-request auth configuration.
    pub env: Arc<dyn EnvSource>,
    /// Whether this listener terminates TLS itself.
    pub listener_tls: bool,
}

/// HTTP server for the auth proxy.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server reading auth configuration from the process
    /// environment.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_env(config, Arc::new(ProcessEnv))
    }

    /// Create a server with an explicit environment source (tests inject a
    /// `HashMap` here).
    pub fn with_env(config: ServerConfig, env: Arc<dyn EnvSource>) -> Self {
        let state = AppState {
            config: Arc::new(config.clone()),
            client: build_client(),
            env,
            listener_tls: config.listener.tls.is_some(),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route(
                &format!("{PROXY_PREFIX}/auth/refresh"),
                any(handlers::refresh),
            )
            .route(
                &format!("{PROXY_PREFIX}/auth/logout"),
                any(handlers::logout),
            )
            .route(
                &format!("{PROXY_PREFIX}/oauth/callback"),
                any(handlers::oauth_callback),
            )
            .route(PROXY_PREFIX, any(handlers::prefix_not_found))
            .route(
                &format!("{PROXY_PREFIX}/"),
                any(handlers::prefix_not_found),
            )
            .route(
                &format!("{PROXY_PREFIX}/{{*rest}}"),
                any(handlers::prefix_not_found),
            )
            .fallback_service(ServeDir::new(&config.static_assets.dir))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` completes. In-flight requests get the
    /// configured request timeout to finish before connections are closed.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Self { router, config } = self;

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = config.listener.tls.is_some(), "HTTP server starting");

        if let Some(tls) = &config.listener.tls {
            let tls_config =
                load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            let handle = axum_server::Handle::new();
            let grace = Duration::from_secs(config.timeouts.request_secs);
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    shutdown.await;
                    handle.graceful_shutdown(Some(grace));
                }
            });
            axum_server::from_tcp_rustls(listener.into_std()?, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await?;
        } else {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await?;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
