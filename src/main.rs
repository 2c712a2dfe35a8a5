// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meli-Catalog API Server
//!
//! Serves the dealership's vehicle catalog, synced from the seller's active
//! Mercado Libre listings.

use anyhow::Context;
use meli_catalog::{
    config::Config,
    services::{build_http_client, token_store, CatalogService, MeliClient, TokenManager},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Meli-Catalog API");

    // One HTTP client for every upstream call, bounded by the request timeout
    let http = build_http_client(config.http_timeout).context("Failed to build HTTP client")?;

    // Token store and lifecycle manager
    let store = token_store::from_config(&config.token_store, http.clone());
    let tokens = Arc::new(TokenManager::from_config(&config, http.clone(), store));
    tracing::info!(
        fallback_configured = config.fallback_tokens.is_some(),
        "Token manager initialized"
    );

    // Listings client and catalog cache
    let client = MeliClient::new(
        http,
        config.api_base_url.clone(),
        config.meli_user_id.clone(),
        tokens.clone(),
    );
    let catalog = CatalogService::new(client, config.catalog_ttl, config.catalog_retry);
    tracing::info!(
        ttl_secs = config.catalog_ttl.as_secs(),
        "Catalog service initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        tokens,
        catalog,
    });

    // Warm the catalog so the first visitor does not pay for the sync
    let warm_state = state.clone();
    tokio::spawn(async move {
        let snapshot = warm_state.catalog.fetch_catalog().await;
        tracing::info!(
            count = snapshot.vehicles.len(),
            degraded = snapshot.degraded,
            "Catalog warmed"
        );
    });

    // Build router
    let app = meli_catalog::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meli_catalog=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
