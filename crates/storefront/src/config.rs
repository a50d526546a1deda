//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOREFRONT_API_BASE` - Base URL of the remote storefront service
//! - `STOREFRONT_BACKEND_URL` - Fallback for `STOREFRONT_API_BASE`
//!   (default: `http://localhost:3001`)
//! - `STOREFRONT_CART_ID_PATH` - File the cart identity is persisted to
//!   (default: `.greenmarket/cart_id`)
//! - `STOREFRONT_USER_AGENT` - User agent sent with every request

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Base URL used when no environment variable is set.
pub const DEFAULT_API_BASE: &str = "http://localhost:3001";

/// Default location of the persisted cart identity.
pub const DEFAULT_CART_ID_PATH: &str = ".greenmarket/cart_id";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote storefront service (no trailing slash)
    pub api_base_url: String,
    /// File the cart identity is persisted to
    pub cart_id_path: PathBuf,
    /// Optional user agent for outgoing requests
    pub user_agent: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configured base URL does not parse as a
    /// valid URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = resolve_api_base_url()?;
        let cart_id_path =
            PathBuf::from(get_env_or_default("STOREFRONT_CART_ID_PATH", DEFAULT_CART_ID_PATH));
        let user_agent = get_optional_env("STOREFRONT_USER_AGENT");

        Ok(Self {
            api_base_url,
            cart_id_path,
            user_agent,
        })
    }
}

/// Resolve the service base URL from the environment with safe fallbacks.
///
/// Checks `STOREFRONT_API_BASE`, then `STOREFRONT_BACKEND_URL`, then falls
/// back to [`DEFAULT_API_BASE`]. Trailing slashes are trimmed so paths can
/// be appended directly.
fn resolve_api_base_url() -> Result<String, ConfigError> {
    let raw = get_optional_env("STOREFRONT_API_BASE")
        .or_else(|| get_optional_env("STOREFRONT_BACKEND_URL"))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    let sanitized = sanitize_base_url(&raw);
    Url::parse(&sanitized).map_err(|e| {
        ConfigError::InvalidEnvVar("STOREFRONT_API_BASE".to_string(), e.to_string())
    })?;

    Ok(sanitized)
}

/// Trim whitespace and trailing slashes from a base URL.
fn sanitize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_base_url_trims_trailing_slashes() {
        assert_eq!(
            sanitize_base_url("http://localhost:3001/"),
            "http://localhost:3001"
        );
        assert_eq!(
            sanitize_base_url("  https://shop.example.com//  "),
            "https://shop.example.com"
        );
    }

    #[test]
    fn test_sanitize_base_url_leaves_clean_urls_alone() {
        assert_eq!(
            sanitize_base_url("http://localhost:3001"),
            "http://localhost:3001"
        );
    }

    #[test]
    fn test_default_api_base_parses() {
        assert!(Url::parse(DEFAULT_API_BASE).is_ok());
    }

    #[test]
    fn test_config_construction() {
        let config = StorefrontConfig {
            api_base_url: "http://localhost:3001".to_string(),
            cart_id_path: PathBuf::from(DEFAULT_CART_ID_PATH),
            user_agent: None,
        };
        assert_eq!(config.api_base_url, "http://localhost:3001");
        assert!(config.user_agent.is_none());
    }
}
