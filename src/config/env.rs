//! Per-request auth configuration derived from the environment.
//!
//! # Responsibilities
//! - Resolve the upstream origin, app id, cookie name/path/max-age
//! - Re-evaluate on every proxied request; no cross-request cache
//!
//! # Design Decisions
//! - Pure function of an `EnvSource`, so tests inject a `HashMap` instead of
//!   mutating process-global state
//! - `cookie_name` is always derived from the app id, never set independently

use std::collections::HashMap;

use crate::config::origin::{ensure_trailing_slash, resolve_origin};

/// Fixed path namespace under which the proxy intercepts requests.
pub const PROXY_PREFIX: &str = "/proxy";

/// Default refresh-cookie lifetime: 7 days.
pub const DEFAULT_COOKIE_MAX_AGE: u32 = 604_800;

const ORIGIN_VARS: [&str; 2] = ["API_ORIGIN", "VITE_API_URL"];
const APP_ID_VARS: [&str; 2] = ["APP_ID", "VITE_APP_ID"];
const COOKIE_MAX_AGE_VAR: &str = "REFRESH_PROXY_COOKIE_MAX_AGE";
const COOKIE_PATH_VAR: &str = "REFRESH_PROXY_COOKIE_PATH";

/// Source of environment variables.
pub trait EnvSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// The process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Auth configuration for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub api_origin: Option<String>,
    pub app_id: Option<String>,
    pub cookie_name: Option<String>,
    pub cookie_path: String,
    pub cookie_max_age: u32,
}

/// Borrowed view of an [`AuthConfig`] with all required fields present.
#[derive(Debug, Clone, Copy)]
pub struct ReadyAuthConfig<'a> {
    pub api_origin: &'a str,
    pub app_id: &'a str,
    pub cookie_name: &'a str,
    pub cookie_path: &'a str,
    pub cookie_max_age: u32,
}

/// Environment variables that were missing or unresolvable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingConfig(pub Vec<&'static str>);

impl std::fmt::Display for MissingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl AuthConfig {
    /// Derive the configuration from the given environment source.
    pub fn load(env: &dyn EnvSource) -> Self {
        let raw_origin = first_non_empty(env, &ORIGIN_VARS);
        let fallback_base = env.get(ORIGIN_VARS[0]);
        let api_origin =
            raw_origin.and_then(|v| resolve_origin(&v, fallback_base.as_deref()));

        let app_id = first_non_empty(env, &APP_ID_VARS);
        let cookie_name = app_id.as_ref().map(|id| format!("rt-{id}"));

        let cookie_max_age = env
            .get(COOKIE_MAX_AGE_VAR)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_COOKIE_MAX_AGE);

        let cookie_path = ensure_trailing_slash(
            &env.get(COOKIE_PATH_VAR)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| PROXY_PREFIX.to_string()),
        );

        Self {
            api_origin,
            app_id,
            cookie_name,
            cookie_path,
            cookie_max_age,
        }
    }

    /// Fail fast unless origin, app id, and cookie name are all present.
    pub fn ready(&self) -> Result<ReadyAuthConfig<'_>, MissingConfig> {
        let mut missing = Vec::new();
        if self.api_origin.is_none() {
            missing.push("API_ORIGIN");
        }
        if self.app_id.is_none() {
            missing.push("APP_ID");
        }
        match (&self.api_origin, &self.app_id, &self.cookie_name) {
            (Some(api_origin), Some(app_id), Some(cookie_name)) => Ok(ReadyAuthConfig {
                api_origin,
                app_id,
                cookie_name,
                cookie_path: &self.cookie_path,
                cookie_max_age: self.cookie_max_age,
            }),
            _ => Err(MissingConfig(missing)),
        }
    }
}

fn first_non_empty(env: &dyn EnvSource, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| env.get(k))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
