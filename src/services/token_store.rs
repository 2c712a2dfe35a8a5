// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage for the current token pair.
//!
//! Reads never fail: a missing, unreachable or corrupt store is logged and
//! reported as empty so the caller can bootstrap or refresh. Writes report
//! errors, but callers treat them as non-fatal for the token they already
//! hold in memory.

use crate::config::TokenStoreConfig;
use crate::models::Tokens;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Key/value persistence for a single token pair.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored pair, or `None` if nothing usable is stored.
    async fn load(&self) -> Option<Tokens>;

    /// Persist `tokens`, replacing whatever was stored.
    async fn save(&self, tokens: &Tokens) -> Result<(), StoreError>;
}

/// Build the store selected by configuration.
pub fn from_config(config: &TokenStoreConfig, http: reqwest::Client) -> Arc<dyn TokenStore> {
    match config {
        TokenStoreConfig::Http { url, api_key } => {
            tracing::info!(url = %url, "Using remote token store");
            Arc::new(HttpTokenStore::new(http, url.clone(), api_key.clone()))
        }
        TokenStoreConfig::File { path } => {
            tracing::info!(path = %path.display(), "Using file token store");
            Arc::new(FileTokenStore::new(path.clone()))
        }
        TokenStoreConfig::Memory => {
            tracing::warn!(
                "No durable token store configured, refreshed tokens are lost on restart"
            );
            Arc::new(MemoryTokenStore::default())
        }
    }
}

// ─── Remote endpoint ─────────────────────────────────────────────────────────

/// Token store backed by a remote key-protected endpoint.
#[derive(Clone)]
pub struct HttpTokenStore {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

/// Body of a save request.
#[derive(Serialize)]
struct SaveRequest<'a> {
    key: &'a str,
    tokens: &'a Tokens,
}

impl HttpTokenStore {
    pub fn new(http: reqwest::Client, url: String, api_key: String) -> Self {
        Self { http, url, api_key }
    }

    async fn fetch(&self) -> Result<Value, StoreError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Serialize(e.to_string()))
    }
}

#[async_trait]
impl TokenStore for HttpTokenStore {
    async fn load(&self) -> Option<Tokens> {
        let json = match self.fetch().await {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read tokens from store");
                return None;
            }
        };

        if json.get("error").and_then(Value::as_str) == Some("NO_TOKENS") {
            tracing::warn!("Token store has no tokens yet");
            return None;
        }

        let tokens = parse_stored_tokens(&json);
        if tokens.is_none() {
            tracing::error!("Token store returned an incomplete token record");
        }
        tokens
    }

    async fn save(&self, tokens: &Tokens) -> Result<(), StoreError> {
        let response = self
            .http
            .post(&self.url)
            .json(&SaveRequest {
                key: &self.api_key,
                tokens,
            })
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        tracing::debug!("Tokens saved to remote store");
        Ok(())
    }
}

/// Parse a stored record leniently: the remote side is a spreadsheet script
/// that may hand back numbers as strings.
fn parse_stored_tokens(json: &Value) -> Option<Tokens> {
    let text = |key: &str| match json.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    let expires_ms = match json.get("expiresAt")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !expires_ms.is_finite() || expires_ms <= 0.0 {
        return None;
    }

    Some(Tokens {
        access_token: text("accessToken")?,
        refresh_token: text("refreshToken")?,
        expires_at: DateTime::<Utc>::from_timestamp_millis(expires_ms as i64)?,
    })
}

// ─── Local file ──────────────────────────────────────────────────────────────

/// Token store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Option<Tokens> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Token file does not exist yet");
                return None;
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to read token file");
                return None;
            }
        };

        let tokens = serde_json::from_str::<Value>(&contents)
            .ok()
            .and_then(|json| parse_stored_tokens(&json));
        if tokens.is_none() {
            tracing::error!(path = %self.path.display(), "Token file is corrupt, ignoring it");
        }
        tokens
    }

    async fn save(&self, tokens: &Tokens) -> Result<(), StoreError> {
        let json =
            serde_json::to_vec_pretty(tokens).map_err(|e| StoreError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write beside the target and rename so readers never see a torn file.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(path = %self.path.display(), "Tokens saved to file");
        Ok(())
    }
}

// ─── In-memory ───────────────────────────────────────────────────────────────

/// Process-local store. Used when nothing durable is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<Tokens>>,
}

impl MemoryTokenStore {
    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Option<Tokens> {
        self.tokens.lock().ok().and_then(|guard| guard.clone())
    }

    async fn save(&self, tokens: &Tokens) -> Result<(), StoreError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| StoreError::Io("memory token store poisoned".to_string()))?;
        *guard = Some(tokens.clone());
        Ok(())
    }
}

/// Errors from token store writes (and internal read steps).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Token store request failed: {0}")]
    Transport(String),

    #[error("Token store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token store I/O error: {0}")]
    Io(String),

    #[error("Token store serialization error: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
