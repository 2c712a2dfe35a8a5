// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mercado Libre OAuth token lifecycle.
//!
//! Handles:
//! - Loading the initial token pair from the ordered credential sources
//! - Serving the cached access token while it is outside the refresh margin
//! - Refreshing through the OAuth endpoint, exactly once per expiry cycle
//!   no matter how many callers are waiting
//! - Writing refreshed tokens back to the token store

use crate::config::Config;
use crate::models::Tokens;
use crate::services::credentials::{self, CredentialSource};
use crate::services::token_store::TokenStore;
use chrono::{Duration, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (1 minute).
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the OAuth response carries no usable `expires_in` (6 hours).
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 21_600;

/// Errors obtaining an access token.
///
/// `Clone` because one refresh result is handed to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("No token source available: {0}")]
    Configuration(String),

    #[error("Token refresh rejected with HTTP {status}: {body}")]
    Refresh { status: u16, body: String },

    #[error("Token refresh request failed: {0}")]
    Transport(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuthClient - raw refresh_token grant
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the OAuth token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

/// Token refresh response from Mercado Libre.
#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<Value>,
}

impl OAuthClient {
    pub fn new(
        http: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http,
            token_url,
            client_id,
            client_secret,
        }
    }

    /// Exchange `refresh_token` for a new pair.
    ///
    /// The returned expiry is computed from the moment the response arrives.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %body, "Mercado Libre token refresh failed");
            return Err(AuthError::Refresh { status, body });
        }

        let payload: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let expires_in = parse_expires_in(payload.expires_in.as_ref());

        Ok(Tokens {
            access_token: payload.access_token,
            // Keep the old refresh token if the response does not rotate it.
            refresh_token: payload
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

/// `expires_in` in seconds; anything absent, non-numeric or non-positive
/// falls back to the default lifetime.
fn parse_expires_in(value: Option<&Value>) -> i64 {
    let secs = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match secs {
        Some(s) if s.is_finite() && s >= 1.0 => s as i64,
        _ => DEFAULT_EXPIRES_IN_SECS,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenManager - valid-token access with single-flight refresh
// ─────────────────────────────────────────────────────────────────────────────

type RefreshFuture = Shared<BoxFuture<'static, Result<Tokens, AuthError>>>;

/// Mutable token state. Guarded as a unit so the "needs refresh" check and
/// the in-flight assignment happen atomically.
#[derive(Default)]
struct TokenState {
    current: Option<Tokens>,
    in_flight: Option<RefreshFuture>,
}

/// Owns the token pair and hands out valid access tokens.
pub struct TokenManager {
    oauth: OAuthClient,
    store: Arc<dyn TokenStore>,
    sources: Vec<Box<dyn CredentialSource>>,
    state: Arc<Mutex<TokenState>>,
}

impl TokenManager {
    pub fn new(
        oauth: OAuthClient,
        store: Arc<dyn TokenStore>,
        sources: Vec<Box<dyn CredentialSource>>,
    ) -> Self {
        Self {
            oauth,
            store,
            sources,
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    /// Wire up the manager from configuration with the standard source order.
    pub fn from_config(config: &Config, http: reqwest::Client, store: Arc<dyn TokenStore>) -> Self {
        let oauth = OAuthClient::new(
            http,
            config.oauth_url.clone(),
            config.meli_app_id.clone(),
            config.meli_app_secret.clone(),
        );
        let sources = credentials::default_sources(store.clone(), config.fallback_tokens.clone());
        Self::new(oauth, store, sources)
    }

    /// Get a valid (non-expiring) access token.
    ///
    /// 1. Initialize from the credential sources on first use
    /// 2. Return the cached token if it is outside the refresh margin (no I/O)
    /// 3. Otherwise join the in-flight refresh, or start it
    pub async fn get_valid_access_token(&self) -> Result<String, AuthError> {
        let pending = {
            let mut state = self.state.lock().await;
            let tokens = self.current_tokens(&mut state).await?;

            if tokens.is_fresh_at(Utc::now(), Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)) {
                return Ok(tokens.access_token);
            }

            tracing::info!("Access token expired or expiring, refreshing");
            self.pending_refresh(&mut state, tokens.refresh_token)
        };

        pending.await.map(|tokens| tokens.access_token)
    }

    /// Refresh now regardless of the current token's remaining lifetime.
    ///
    /// Joins an in-flight refresh if there is one.
    pub async fn force_refresh(&self) -> Result<Tokens, AuthError> {
        let pending = {
            let mut state = self.state.lock().await;
            let tokens = self.current_tokens(&mut state).await?;
            self.pending_refresh(&mut state, tokens.refresh_token)
        };

        pending.await
    }

    /// In-memory tokens, loading them from the credential sources the first time.
    async fn current_tokens(&self, state: &mut TokenState) -> Result<Tokens, AuthError> {
        if let Some(tokens) = &state.current {
            return Ok(tokens.clone());
        }

        let tokens = credentials::resolve_first(&self.sources)
            .await
            .ok_or_else(|| {
                AuthError::Configuration(
                    "token store is empty and no fallback token pair is configured".to_string(),
                )
            })?;

        state.current = Some(tokens.clone());
        Ok(tokens)
    }

    /// The shared refresh future, creating it if no refresh is in flight.
    ///
    /// The future itself installs its result and clears the in-flight marker
    /// when it completes, whichever waiter happens to be driving it.
    fn pending_refresh(&self, state: &mut TokenState, refresh_token: String) -> RefreshFuture {
        if let Some(pending) = &state.in_flight {
            tracing::debug!("Joining in-flight token refresh");
            return pending.clone();
        }

        let oauth = self.oauth.clone();
        let store = Arc::clone(&self.store);
        let shared_state = Arc::clone(&self.state);

        let refresh = async move {
            let result = oauth.refresh(&refresh_token).await;

            if let Ok(tokens) = &result {
                if let Err(e) = store.save(tokens).await {
                    tracing::warn!(
                        error = %e,
                        "Failed to persist refreshed tokens, using them from memory"
                    );
                }
            }

            let mut state = shared_state.lock().await;
            state.in_flight = None;
            match &result {
                Ok(tokens) => {
                    state.current = Some(tokens.clone());
                    tracing::info!(
                        expires_in = tokens.expires_in_secs(Utc::now()),
                        "Token refreshed"
                    );
                }
                Err(e) => tracing::warn!(error = %e, "Token refresh failed"),
            }

            result
        }
        .boxed()
        .shared();

        state.in_flight = Some(refresh.clone());
        refresh
    }
}
