// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret authentication for operational endpoints.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Middleware that requires `Authorization: Bearer <CRON_SECRET>`.
///
/// When no secret is configured the request is let through.
pub async fn require_cron_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.config.cron_secret.as_deref() else {
        tracing::warn!("CRON_SECRET not set, operational endpoint is unauthenticated");
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("");

    if !bool::from(provided.as_bytes().ct_eq(secret.as_bytes())) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid cron secret");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
