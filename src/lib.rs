// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Meli-Catalog: dealership vehicle catalog synced from Mercado Libre
//!
//! This crate keeps the seller's OAuth tokens valid, pulls the active
//! listings, normalizes them into canonical vehicle records, and serves the
//! cached catalog to the website over a small JSON API.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{CatalogService, TokenManager};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: Arc<TokenManager>,
    pub catalog: CatalogService,
}
