//! Gateway configuration
//!
//! Everything is read from the environment. The binary loads a `.env`
//! file first (via `dotenvy`), so local development only needs that file.

use crate::error::{AppError, AppResult};
use log::{info, warn};
use std::env;

/// Base URL variables, in order of precedence.
pub const BACKEND_URL_VARS: [&str; 3] = [
    "INTERNAL_API_URL",
    "NEXT_PUBLIC_BACKEND_INTERNAL_URL",
    "NEXT_PUBLIC_API_URL",
];

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_FALLBACK_URL: &str = "http://backend:8000";
pub const DEFAULT_PORT: u16 = 3000;

const DEV_SESSION_SECRET: &str = "coachsync-development-session-secret";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Primary backend base URL, without trailing slash.
    pub backend_url: String,
    /// Secondary Docker hostname tried when the primary refuses the connection.
    pub fallback_url: Option<String>,
    pub session_secret: String,
    /// Verifies NextAuth session cookies; without it they are ignored.
    pub nextauth_secret: Option<String>,
    pub cookie_secure: bool,
    pub port: u16,
    pub production: bool,
}

impl GatewayConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let production = get("RUST_ENV").map(|v| v == "production").unwrap_or(false);

        let backend_url = resolve_base_url(&lookup);

        let fallback_url = match get("BACKEND_FALLBACK_URL") {
            Some(value) if value == "none" => None,
            Some(value) => Some(value),
            None => Some(DEFAULT_FALLBACK_URL.to_string()),
        };

        let session_secret = get("SESSION_SECRET").unwrap_or_else(|| {
            warn!("SESSION_SECRET not set, using development secret");
            DEV_SESSION_SECRET.to_string()
        });

        let nextauth_secret = get("NEXTAUTH_SECRET");

        let cookie_secure = match get("COOKIE_SECURE") {
            Some(value) => parse_bool("COOKIE_SECURE", &value)?,
            None => production,
        };

        let port = match get("PORT") {
            Some(value) => value
                .parse()
                .map_err(|e| AppError::config(format!("Invalid PORT value '{}': {}", value, e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            backend_url,
            fallback_url: fallback_url.map(|url| url.trim_end_matches('/').to_string()),
            session_secret,
            nextauth_secret,
            cookie_secure,
            port,
            production,
        })
    }

    /// Rejects configurations that would be unsafe or unusable.
    pub fn validate(&self) -> AppResult<()> {
        validate_base_url("backend URL", &self.backend_url)?;
        if let Some(fallback) = &self.fallback_url {
            validate_base_url("fallback URL", fallback)?;
        }

        if self.production {
            if self.session_secret == DEV_SESSION_SECRET {
                return Err(AppError::config("SESSION_SECRET must be set in production"));
            }
            if self.session_secret.len() < MIN_SECRET_LEN {
                return Err(AppError::config(format!(
                    "SESSION_SECRET must be at least {} characters",
                    MIN_SECRET_LEN
                )));
            }
        }

        info!(
            "Configuration validated (backend: {}, fallback: {}, secure cookies: {}, NextAuth: {})",
            self.backend_url,
            self.fallback_url.as_deref().unwrap_or("none"),
            self.cookie_secure,
            if self.nextauth_secret.is_some() { "verified" } else { "disabled" }
        );
        Ok(())
    }

    /// Config for tests and tools that talk to a known backend.
    pub fn for_backend(backend_url: impl Into<String>, session_secret: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            fallback_url: None,
            session_secret: session_secret.into(),
            nextauth_secret: None,
            cookie_secure: false,
            port: DEFAULT_PORT,
            production: false,
        }
    }
}

/// First non-empty variable of [`BACKEND_URL_VARS`], else the default,
/// without a trailing slash.
pub fn resolve_base_url<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let url = BACKEND_URL_VARS
        .iter()
        .find_map(|key| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|value| {
                    info!("Using backend URL from {}", key);
                    value
                })
        })
        .unwrap_or_else(|| {
            info!("No backend URL configured, using default: {}", DEFAULT_BACKEND_URL);
            DEFAULT_BACKEND_URL.to_string()
        });

    url.trim_end_matches('/').to_string()
}

fn parse_bool(key: &str, value: &str) -> AppResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::config(format!("Invalid {} value: {}", key, other))),
    }
}

fn validate_base_url(label: &str, value: &str) -> AppResult<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| AppError::config(format!("Invalid {} '{}': {}", label, value, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::config(format!(
            "Unsupported scheme '{}' for {}",
            scheme, label
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.fallback_url.as_deref(), Some(DEFAULT_FALLBACK_URL));
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.cookie_secure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_url_precedence() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("NEXT_PUBLIC_API_URL", "http://public:8000"),
            ("INTERNAL_API_URL", "http://internal:8000/"),
        ]))
        .unwrap();
        assert_eq!(config.backend_url, "http://internal:8000");

        let config = GatewayConfig::from_lookup(lookup(&[
            ("NEXT_PUBLIC_API_URL", "http://public:8000"),
            ("NEXT_PUBLIC_BACKEND_INTERNAL_URL", "http://backend-internal:8000"),
        ]))
        .unwrap();
        assert_eq!(config.backend_url, "http://backend-internal:8000");
    }

    #[test]
    fn test_resolve_base_url_skips_blank_values() {
        let url = resolve_base_url(lookup(&[
            ("INTERNAL_API_URL", "   "),
            ("NEXT_PUBLIC_API_URL", "https://api.coachsync.app/"),
        ]));
        assert_eq!(url, "https://api.coachsync.app");
        assert_eq!(resolve_base_url(lookup(&[])), DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_nextauth_secret_is_optional() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.nextauth_secret.is_none());

        let config = GatewayConfig::from_lookup(lookup(&[("NEXTAUTH_SECRET", "na-secret")])).unwrap();
        assert_eq!(config.nextauth_secret.as_deref(), Some("na-secret"));
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let config = GatewayConfig::from_lookup(lookup(&[("BACKEND_FALLBACK_URL", "none")])).unwrap();
        assert!(config.fallback_url.is_none());
    }

    #[test]
    fn test_production_requires_secret() {
        let config = GatewayConfig::from_lookup(lookup(&[("RUST_ENV", "production")])).unwrap();
        assert!(config.cookie_secure);
        assert!(config.validate().is_err());

        let config = GatewayConfig::from_lookup(lookup(&[
            ("RUST_ENV", "production"),
            ("SESSION_SECRET", "short"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(GatewayConfig::from_lookup(lookup(&[("PORT", "abc")])).is_err());
        assert!(GatewayConfig::from_lookup(lookup(&[("COOKIE_SECURE", "maybe")])).is_err());

        let config = GatewayConfig::from_lookup(lookup(&[("INTERNAL_API_URL", "ftp://backend")])).unwrap();
        assert!(config.validate().is_err());
    }
}
