// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod catalog;
pub mod credentials;
pub mod meli;
pub mod normalize;
pub mod slug;
pub mod token_store;

pub use auth::{AuthError, OAuthClient, TokenManager};
pub use catalog::CatalogService;
pub use meli::{build_http_client, ListingError, MeliClient};
pub use token_store::{FileTokenStore, HttpTokenStore, MemoryTokenStore, StoreError, TokenStore};
