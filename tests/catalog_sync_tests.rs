// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog sync pipeline tests against a mock listings API.

use meli_catalog::services::{CatalogService, MemoryTokenStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{item_json, mount_item, mount_item_search, SELLER_ID};

const TTL: Duration = Duration::from_secs(600);
const RETRY: Duration = Duration::from_secs(60);

fn service(server: &MockServer) -> CatalogService {
    common::catalog_service(server, common::store_with_valid_token(), TTL, RETRY)
}

fn search_path() -> String {
    format!("/users/{}/items/search", SELLER_ID)
}

#[tokio::test]
async fn test_empty_listing_is_empty_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .and(query_param("status", "active"))
        .and(header("authorization", "Bearer APP_USR-valid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = service(&server).build_catalog().await;

    assert!(snapshot.vehicles.is_empty());
    assert!(!snapshot.degraded);
}

#[tokio::test]
async fn test_builds_normalized_vehicles_in_listing_order() {
    let server = MockServer::start().await;
    mount_item_search(&server, &["MLA1", "MLA2"]).await;
    mount_item(&server, item_json("MLA1", "Ford", "Fiesta", "2020", "45000")).await;
    mount_item(&server, item_json("MLA2", "Volkswagen", "Gol Trend", "2015", "98000")).await;

    let snapshot = service(&server).build_catalog().await;

    let slugs: Vec<&str> = snapshot.vehicles.iter().map(|v| v.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec!["ford-fiesta-2020-45000", "volkswagen-gol-2015-98000"]
    );

    let fiesta = &snapshot.vehicles[0];
    assert_eq!(fiesta.id, "MLA1");
    assert_eq!(fiesta.price, Some(15_000_000.0));
    assert_eq!(fiesta.image_url, "https://http2.mlstatic.com/MLA1-O.jpg");
    assert_eq!(
        fiesta.raw_attributes.get("FUEL_TYPE").map(String::as_str),
        Some("Nafta")
    );
}

#[tokio::test]
async fn test_one_failed_item_is_dropped() {
    let server = MockServer::start().await;
    mount_item_search(&server, &["MLA1", "MLA2", "MLA3"]).await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;
    Mock::given(method("GET"))
        .and(path("/items/MLA2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;
    mount_item(&server, item_json("MLA3", "Fiat", "Cronos", "2022", "15000")).await;

    let snapshot = service(&server).build_catalog().await;

    assert!(!snapshot.degraded);
    let ids: Vec<&str> = snapshot.vehicles.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["MLA1", "MLA3"]);
}

#[tokio::test]
async fn test_slow_item_is_dropped_on_timeout() {
    let server = MockServer::start().await;
    mount_item_search(&server, &["MLA1", "MLA2"]).await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;
    Mock::given(method("GET"))
        .and(path("/items/MLA2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(item_json("MLA2", "Fiat", "Uno", "2010", "1"))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    // Client with a short timeout so the slow listing counts as failed
    let tokens = common::token_manager(&server, common::store_with_valid_token(), None);
    let http = meli_catalog::services::build_http_client(Duration::from_millis(500)).unwrap();
    let client =
        meli_catalog::services::MeliClient::new(http, server.uri(), SELLER_ID.to_string(), tokens);
    let snapshot = CatalogService::new(client, TTL, RETRY).build_catalog().await;

    assert_eq!(snapshot.vehicles.len(), 1);
    assert_eq!(snapshot.vehicles[0].id, "MLA1");
}

#[tokio::test]
async fn test_list_failure_degrades_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let snapshot = service(&server).build_catalog().await;

    assert!(snapshot.vehicles.is_empty());
    assert!(snapshot.degraded);
}

#[tokio::test]
async fn test_missing_credentials_degrade_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(0)
        .mount(&server)
        .await;

    let catalog = common::catalog_service(
        &server,
        Arc::new(MemoryTokenStore::default()),
        TTL,
        RETRY,
    );
    let snapshot = catalog.fetch_catalog().await;

    assert!(snapshot.vehicles.is_empty());
    assert!(snapshot.degraded);
}

#[tokio::test]
async fn test_fetch_within_ttl_lists_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": ["MLA1"]})))
        .expect(1)
        .mount(&server)
        .await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;

    let catalog = service(&server);
    let first = catalog.fetch_catalog().await;
    let second = catalog.fetch_catalog().await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.vehicles.len(), 1);
}

#[tokio::test]
async fn test_expired_snapshot_is_rebuilt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": ["MLA1"]})))
        .expect(2)
        .mount(&server)
        .await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;

    let catalog = common::catalog_service(
        &server,
        common::store_with_valid_token(),
        Duration::ZERO,
        RETRY,
    );
    let first = catalog.fetch_catalog().await;
    let second = catalog.fetch_catalog().await;

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.fetched_at >= first.fetched_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_readers_share_one_build() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": ["MLA1"]}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;

    let catalog = Arc::new(service(&server));

    let mut handles = vec![];
    for _ in 0..10 {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move { catalog.fetch_catalog().await }));
    }

    let mut snapshots = vec![];
    for handle in handles {
        snapshots.push(handle.await.expect("Task join failed"));
    }

    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
    assert_eq!(snapshots[0].vehicles.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_after_ttl_expiry_share_one_rebuild() {
    let server = MockServer::start().await;
    // One warm-up build plus exactly one rebuild for the stale round
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": ["MLA1"]}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(2)
        .mount(&server)
        .await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;

    let catalog = Arc::new(common::catalog_service(
        &server,
        common::store_with_valid_token(),
        Duration::from_millis(150),
        RETRY,
    ));

    let warm = catalog.fetch_catalog().await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut handles = vec![];
    for _ in 0..10 {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move { catalog.fetch_catalog().await }));
    }

    let mut snapshots = vec![];
    for handle in handles {
        snapshots.push(handle.await.expect("Task join failed"));
    }

    assert!(!Arc::ptr_eq(&warm, &snapshots[0]));
    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
    assert!(snapshots[0].fetched_at > warm.fetched_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rebuild_survives_cancelled_reader() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": ["MLA1"]}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;

    let catalog = Arc::new(service(&server));

    // The first reader starts the rebuild, then goes away mid-flight
    // (e.g. its HTTP client disconnected).
    let first = {
        let catalog = catalog.clone();
        tokio::spawn(async move { catalog.fetch_catalog().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut handles = vec![];
    for _ in 0..5 {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move { catalog.fetch_catalog().await }));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    first.abort();

    let mut snapshots = vec![];
    for handle in handles {
        snapshots.push(handle.await.expect("Task join failed"));
    }

    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
    assert!(!snapshots[0].degraded);
    assert_eq!(snapshots[0].vehicles.len(), 1);

    let searches = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == search_path())
        .count();
    assert_eq!(searches, 1);
}

#[tokio::test]
async fn test_degraded_snapshot_retried_after_retry_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(search_path()))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_item_search(&server, &["MLA1"]).await;
    mount_item(&server, item_json("MLA1", "Ford", "Ka", "2017", "60000")).await;

    let catalog = common::catalog_service(
        &server,
        common::store_with_valid_token(),
        TTL,
        Duration::ZERO,
    );

    assert!(catalog.fetch_catalog().await.degraded);

    let recovered = catalog.fetch_catalog().await;
    assert!(!recovered.degraded);
    assert_eq!(recovered.vehicles.len(), 1);
}

#[tokio::test]
async fn test_fetch_vehicle_by_slug() {
    let server = MockServer::start().await;
    mount_item_search(&server, &["MLA1", "MLA2"]).await;
    mount_item(&server, item_json("MLA1", "Ford", "Fiesta", "2020", "45000")).await;
    mount_item(&server, item_json("MLA2", "Ford", "Fiesta", "2020", "45000")).await;

    let catalog = service(&server);

    let vehicle = catalog
        .fetch_vehicle_by_slug("ford-fiesta-2020-45000")
        .await
        .expect("vehicle");
    assert_eq!(vehicle.id, "MLA1");

    // Same brand/model/year/km gets the listing id appended
    let twin = catalog
        .fetch_vehicle_by_slug("ford-fiesta-2020-45000-mla2")
        .await
        .expect("twin");
    assert_eq!(twin.id, "MLA2");

    assert!(catalog.fetch_vehicle_by_slug("renault-clio-2001").await.is_none());
}

#[tokio::test]
async fn test_description_failure_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/MLA1/description"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "",
            "plain_text": "Único dueño. Service oficial."
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items/MLA2/description"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let catalog = service(&server);

    assert_eq!(
        catalog.fetch_vehicle_description("MLA1").await,
        "Único dueño. Service oficial."
    );
    assert_eq!(catalog.fetch_vehicle_description("MLA2").await, "");
}
