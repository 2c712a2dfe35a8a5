// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. A `.env` file is honored for local
//! development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Mercado Libre API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadolibre.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Marketplace account ---
    /// Seller user ID whose active listings make up the catalog
    pub meli_user_id: String,
    /// OAuth application ID
    pub meli_app_id: String,
    /// OAuth application secret
    pub meli_app_secret: String,
    /// Initial token pair used only when the store holds nothing yet
    pub fallback_tokens: Option<FallbackTokens>,

    // --- Upstream endpoints ---
    pub api_base_url: String,
    pub oauth_url: String,
    /// Bound applied to every upstream HTTP call
    pub http_timeout: Duration,

    // --- Token store ---
    pub token_store: TokenStoreConfig,

    // --- Catalog cache ---
    /// How long a healthy snapshot is served before a rebuild
    pub catalog_ttl: Duration,
    /// How long an empty fallback snapshot is served before retrying upstream
    pub catalog_retry: Duration,

    // --- Server ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Bearer secret guarding the manual refresh endpoint
    pub cron_secret: Option<String>,
    pub port: u16,
}

/// Access/refresh token pair supplied through the environment.
#[derive(Clone)]
pub struct FallbackTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for FallbackTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FallbackTokens(<redacted>)")
    }
}

/// Where the current token pair is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStoreConfig {
    /// Remote key/value endpoint (`GET ?key=`, `POST {key, tokens}`)
    Http { url: String, api_key: String },
    /// JSON file on local disk
    File { path: PathBuf },
    /// Nothing durable configured; tokens live for the process lifetime
    Memory,
}

impl Config {
    /// Default config for testing only, pointed at `base_url`.
    pub fn test_default(base_url: &str) -> Self {
        Self {
            meli_user_id: "123456".to_string(),
            meli_app_id: "test_app_id".to_string(),
            meli_app_secret: "test_app_secret".to_string(),
            fallback_tokens: None,
            api_base_url: base_url.to_string(),
            oauth_url: format!("{}/oauth/token", base_url),
            http_timeout: Duration::from_secs(5),
            token_store: TokenStoreConfig::Memory,
            catalog_ttl: Duration::from_secs(600),
            catalog_retry: Duration::from_secs(60),
            frontend_url: "http://localhost:3000".to_string(),
            cron_secret: None,
            port: 8080,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = optional("MELI_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let oauth_url =
            optional("MELI_OAUTH_URL").unwrap_or_else(|| format!("{}/oauth/token", api_base_url));

        let fallback_tokens = match (optional("MELI_ACCESS_TOKEN"), optional("MELI_REFRESH_TOKEN")) {
            (Some(access_token), Some(refresh_token)) => Some(FallbackTokens {
                access_token,
                refresh_token,
            }),
            _ => None,
        };

        let token_store = match (
            optional("MELI_TOKENS_API_URL"),
            optional("MELI_TOKENS_API_KEY"),
            optional("MELI_TOKENS_FILE"),
        ) {
            (Some(url), Some(api_key), _) => TokenStoreConfig::Http { url, api_key },
            (_, _, Some(path)) => TokenStoreConfig::File {
                path: PathBuf::from(path),
            },
            _ => TokenStoreConfig::Memory,
        };

        Ok(Self {
            meli_user_id: required("MELI_USER_ID")?,
            meli_app_id: required("MELI_APP_ID")?,
            meli_app_secret: required("MELI_APP_SECRET")?,
            fallback_tokens,
            api_base_url,
            oauth_url,
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)?),
            token_store,
            catalog_ttl: Duration::from_secs(parse_or("CATALOG_TTL_SECS", 600)?),
            catalog_retry: Duration::from_secs(parse_or("CATALOG_RETRY_SECS", 60)?),
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            cron_secret: optional("CRON_SECRET"),
            port: parse_or("PORT", 8080)?,
        })
    }
}

/// Read a variable, treating blank values as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name, raw)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
