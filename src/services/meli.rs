// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mercado Libre listings API client.
//!
//! Every call is authenticated with a token from [`TokenManager`] and
//! bounded by the shared client's request timeout.

use crate::services::auth::{AuthError, TokenManager};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Build the HTTP client shared by all upstream calls.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Listings API client for one seller.
#[derive(Clone)]
pub struct MeliClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    tokens: Arc<TokenManager>,
}

impl MeliClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        user_id: String,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
            tokens,
        }
    }

    /// IDs of the seller's active listings. An empty list is a normal result.
    pub async fn list_active_item_ids(&self) -> Result<Vec<String>, ListingError> {
        let url = format!(
            "{}/users/{}/items/search",
            self.base_url,
            urlencoding::encode(&self.user_id)
        );
        let access_token = self.tokens.get_valid_access_token().await?;

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("status", "active")])
            .send()
            .await
            .map_err(|e| ListingError::Transport(e.to_string()))?;

        let search: SearchResponse = check_response_json(response).await?;
        tracing::debug!(count = search.results.len(), "Listed active items");
        Ok(search.results)
    }

    /// Full detail of one listing.
    pub async fn get_item_detail(&self, item_id: &str) -> Result<RawItem, ListingError> {
        let url = format!("{}/items/{}", self.base_url, urlencoding::encode(item_id));
        self.get_json(&url).await
    }

    /// Long plain-text description of one listing.
    ///
    /// Descriptions are cosmetic, so any failure yields an empty string.
    pub async fn get_item_description(&self, item_id: &str) -> String {
        let url = format!(
            "{}/items/{}/description",
            self.base_url,
            urlencoding::encode(item_id)
        );

        match self.get_json::<DescriptionResponse>(&url).await {
            Ok(description) => description.plain_text.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(item_id, error = %e, "Failed to fetch item description");
                String::new()
            }
        }
    }

    /// Authenticated GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, ListingError> {
        let access_token = self.tokens.get_valid_access_token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ListingError::Transport(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ListingError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if status == 429 {
            tracing::warn!("Mercado Libre rate limit hit (429)");
        }

        return Err(ListingError::Status { status, body });
    }

    response
        .json()
        .await
        .map_err(|e| ListingError::Decode(e.to_string()))
}

/// Errors from listing calls.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Mercado Libre returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Mercado Libre request failed: {0}")]
    Transport(String),

    #[error("Failed to parse Mercado Libre response: {0}")]
    Decode(String),
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// Active listings search response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<String>,
}

/// Listing description response.
#[derive(Debug, Deserialize)]
struct DescriptionResponse {
    plain_text: Option<String>,
}

/// Listing detail as returned by `/items/{id}`, reduced to the fields the
/// catalog uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Usually a number, but left untyped so a malformed price does not
    /// reject the whole listing.
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub pictures: Vec<RawPicture>,
    #[serde(default)]
    pub attributes: Vec<RawAttribute>,
}

/// One `{id, name, value_name}` entry of a listing's attribute list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttribute {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value_name: Option<String>,
}

/// Listing picture.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPicture {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
}
