// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ordered sources for the initial token pair.
//!
//! Sources are tried in priority order and the first one that yields tokens
//! wins. A source that has nothing to offer returns `None`; it never fails.

use crate::config::FallbackTokens;
use crate::models::Tokens;
use crate::services::token_store::TokenStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Lifetime given to a bootstrapped fallback pair so a real refresh follows soon.
pub const BOOTSTRAP_TTL_SECS: i64 = 5 * 60;

/// Somewhere an initial token pair can come from.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn resolve(&self) -> Option<Tokens>;
}

/// Tokens previously persisted in the token store.
pub struct StoredCredentials {
    store: Arc<dyn TokenStore>,
}

impl StoredCredentials {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialSource for StoredCredentials {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn resolve(&self) -> Option<Tokens> {
        self.store.load().await
    }
}

/// Token pair supplied by configuration, used to seed an empty store.
///
/// The real expiry of the configured access token is unknown, so it is given
/// a short forced lifetime and written back to the store.
pub struct FallbackCredentials {
    tokens: FallbackTokens,
    store: Arc<dyn TokenStore>,
}

impl FallbackCredentials {
    pub fn new(tokens: FallbackTokens, store: Arc<dyn TokenStore>) -> Self {
        Self { tokens, store }
    }
}

#[async_trait]
impl CredentialSource for FallbackCredentials {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn resolve(&self) -> Option<Tokens> {
        tracing::warn!("Token store is empty, bootstrapping from configured tokens");

        let tokens = Tokens {
            access_token: self.tokens.access_token.clone(),
            refresh_token: self.tokens.refresh_token.clone(),
            expires_at: Utc::now() + Duration::seconds(BOOTSTRAP_TTL_SECS),
        };

        if let Err(e) = self.store.save(&tokens).await {
            tracing::warn!(error = %e, "Failed to persist bootstrapped tokens, continuing anyway");
        }

        Some(tokens)
    }
}

/// Standard source order: the store first, then the configured pair if any.
pub fn default_sources(
    store: Arc<dyn TokenStore>,
    fallback: Option<FallbackTokens>,
) -> Vec<Box<dyn CredentialSource>> {
    let mut sources: Vec<Box<dyn CredentialSource>> =
        vec![Box::new(StoredCredentials::new(store.clone()))];
    if let Some(tokens) = fallback {
        sources.push(Box::new(FallbackCredentials::new(tokens, store)));
    }
    sources
}

/// Evaluate `sources` in order and return the first pair found.
pub async fn resolve_first(sources: &[Box<dyn CredentialSource>]) -> Option<Tokens> {
    for source in sources {
        if let Some(tokens) = source.resolve().await {
            tracing::info!(source = source.name(), "Loaded initial tokens");
            return Some(tokens);
        }
        tracing::debug!(source = source.name(), "Credential source had no tokens");
    }
    None
}
