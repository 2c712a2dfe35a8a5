// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, Utc};
use meli_catalog::config::{Config, FallbackTokens};
use meli_catalog::models::Tokens;
use meli_catalog::routes::create_router;
use meli_catalog::services::{
    build_http_client, CatalogService, MeliClient, MemoryTokenStore, TokenManager, TokenStore,
};
use meli_catalog::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Access token the fixtures treat as currently valid.
#[allow(dead_code)]
pub const VALID_ACCESS_TOKEN: &str = "APP_USR-valid";

/// Seller ID used by `Config::test_default`.
#[allow(dead_code)]
pub const SELLER_ID: &str = "123456";

/// Token pair expiring `secs` seconds from now.
#[allow(dead_code)]
pub fn tokens_expiring_in(access: &str, refresh: &str, secs: i64) -> Tokens {
    Tokens {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_at: Utc::now() + Duration::seconds(secs),
    }
}

/// Memory store holding a pair that is valid for another hour.
#[allow(dead_code)]
pub fn store_with_valid_token() -> Arc<dyn TokenStore> {
    Arc::new(MemoryTokenStore::with_tokens(tokens_expiring_in(
        VALID_ACCESS_TOKEN,
        "TG-valid",
        3600,
    )))
}

#[allow(dead_code)]
pub fn http_client() -> reqwest::Client {
    build_http_client(std::time::Duration::from_secs(5)).expect("Failed to build HTTP client")
}

/// Token manager pointed at the mock server's OAuth endpoint.
#[allow(dead_code)]
pub fn token_manager(
    server: &MockServer,
    store: Arc<dyn TokenStore>,
    fallback: Option<FallbackTokens>,
) -> Arc<TokenManager> {
    let mut config = Config::test_default(&server.uri());
    config.fallback_tokens = fallback;
    Arc::new(TokenManager::from_config(&config, http_client(), store))
}

/// Catalog service against the mock server, authenticated with `store`.
#[allow(dead_code)]
pub fn catalog_service(
    server: &MockServer,
    store: Arc<dyn TokenStore>,
    ttl: std::time::Duration,
    retry_after: std::time::Duration,
) -> CatalogService {
    let tokens = token_manager(server, store, None);
    let client = MeliClient::new(
        http_client(),
        server.uri(),
        SELLER_ID.to_string(),
        tokens,
    );
    CatalogService::new(client, ttl, retry_after)
}

/// Successful OAuth refresh response body.
#[allow(dead_code)]
pub fn refresh_response(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 21600,
        "scope": "offline_access read",
        "user_id": 123456,
        "refresh_token": refresh
    })
}

/// Listing detail payload in the shape `/items/{id}` returns.
#[allow(dead_code)]
pub fn item_json(id: &str, brand: &str, model: &str, year: &str, km: &str) -> Value {
    json!({
        "id": id,
        "title": format!("{} {} {}", brand, model, year),
        "price": 15_000_000,
        "currency_id": "ARS",
        "thumbnail": format!("http://http2.mlstatic.com/{}-I.jpg", id),
        "permalink": format!("https://auto.mercadolibre.com.ar/{}", id),
        "pictures": [
            {
                "url": format!("http://http2.mlstatic.com/{}-O.jpg", id),
                "secure_url": format!("https://http2.mlstatic.com/{}-O.jpg", id)
            }
        ],
        "attributes": [
            {"id": "BRAND", "name": "Marca", "value_name": brand},
            {"id": "MODEL", "name": "Modelo", "value_name": model},
            {"id": "VEHICLE_YEAR", "name": "Año", "value_name": year},
            {"id": "KILOMETERS", "name": "Kilómetros", "value_name": format!("{} km", km)},
            {"id": "FUEL_TYPE", "name": "Tipo de combustible", "value_name": "Nafta"}
        ]
    })
}

/// Mount the active-items search returning `ids`.
#[allow(dead_code)]
pub async fn mount_item_search(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{}/items/search", SELLER_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "seller_id": SELLER_ID,
            "results": ids,
            "paging": {"limit": 50, "offset": 0, "total": ids.len()}
        })))
        .mount(server)
        .await;
}

/// Mount a detail response for one listing.
#[allow(dead_code)]
pub async fn mount_item(server: &MockServer, body: Value) {
    let id = body["id"].as_str().expect("item id").to_string();
    Mock::given(method("GET"))
        .and(path(format!("/items/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Create a test app backed by the mock server.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(server: &MockServer, cron_secret: Option<&str>) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default(&server.uri());
    config.cron_secret = cron_secret.map(str::to_string);

    let tokens = Arc::new(TokenManager::from_config(
        &config,
        http_client(),
        store_with_valid_token(),
    ));
    let client = MeliClient::new(
        http_client(),
        config.api_base_url.clone(),
        config.meli_user_id.clone(),
        tokens.clone(),
    );
    let catalog = CatalogService::new(client, config.catalog_ttl, config.catalog_retry);

    let state = Arc::new(AppState {
        config,
        tokens,
        catalog,
    });

    (create_router(state.clone()), state)
}
