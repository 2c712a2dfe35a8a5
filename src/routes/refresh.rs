// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Manual token refresh, meant to be hit by a scheduler.

use crate::error::Result;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Refresh routes. The cron-secret layer is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/meli/refresh", get(refresh_tokens).post(refresh_tokens))
}

/// Refresh result.
#[derive(Serialize)]
pub struct RefreshResponse {
    pub ok: bool,
    /// Lifetime of the new access token in seconds
    pub expires_in: i64,
}

/// Force an OAuth refresh now, sharing any refresh already in flight.
async fn refresh_tokens(State(state): State<Arc<AppState>>) -> Result<Json<RefreshResponse>> {
    let tokens = state.tokens.force_refresh().await?;

    tracing::info!("Manual token refresh completed");
    Ok(Json(RefreshResponse {
        ok: true,
        expires_in: tokens.expires_in_secs(Utc::now()),
    }))
}
