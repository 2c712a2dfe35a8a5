// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog sync pipeline and snapshot cache.
//!
//! A build lists the seller's active items, fetches every detail
//! concurrently, normalizes and slugs them, and publishes the result as one
//! immutable snapshot. Readers only ever see a whole snapshot.

use crate::models::{CatalogSnapshot, Vehicle};
use crate::services::meli::{ListingError, MeliClient, RawItem};
use crate::services::normalize::normalize_item;
use crate::services::slug::{to_slug, vehicle_slug};
use chrono::Utc;
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

/// A rebuild that any number of readers can await.
type BuildFuture = Shared<BoxFuture<'static, Arc<CatalogSnapshot>>>;

/// Builds, caches and serves catalog snapshots.
pub struct CatalogService {
    source: Arc<CatalogSource>,
    /// How long a healthy snapshot is served
    ttl: Duration,
    /// How long a degraded (empty fallback) snapshot is served
    retry_after: Duration,
    /// Rebuild in progress, if any. Owned here rather than by the reader that
    /// started it, so it keeps going if that reader is cancelled.
    in_flight: Arc<Mutex<Option<BuildFuture>>>,
}

/// Upstream client plus the last published snapshot.
struct CatalogSource {
    client: MeliClient,
    /// The lock is only held to swap or clone the `Arc`.
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogService {
    pub fn new(client: MeliClient, ttl: Duration, retry_after: Duration) -> Self {
        Self {
            source: Arc::new(CatalogSource {
                client,
                snapshot: RwLock::new(None),
            }),
            ttl,
            retry_after,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Current snapshot, rebuilding it first if it is missing or stale.
    ///
    /// Readers that find the cache stale while a rebuild is already running
    /// join it and return its result instead of starting another one.
    pub async fn fetch_catalog(&self) -> Arc<CatalogSnapshot> {
        let seen = self.source.published();
        if let Some(snapshot) = seen.as_ref().filter(|s| self.is_fresh(s)) {
            return Arc::clone(snapshot);
        }

        let build = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(pending) = in_flight.as_ref() {
                tracing::debug!("Joining in-flight catalog rebuild");
                pending.clone()
            } else {
                // A rebuild may have finished since we looked.
                if let Some(current) = self.source.published() {
                    let replaced = match &seen {
                        Some(old) => !Arc::ptr_eq(old, &current),
                        None => true,
                    };
                    if replaced || self.is_fresh(&current) {
                        return current;
                    }
                }

                let build = self.start_build();
                *in_flight = Some(build.clone());
                build
            }
        };

        build.await
    }

    /// Build a new snapshot from upstream and publish it.
    ///
    /// Never fails: if the listing source is unavailable the published
    /// snapshot is empty and marked degraded.
    pub async fn build_catalog(&self) -> Arc<CatalogSnapshot> {
        self.source.build().await
    }

    /// Look up one vehicle by slug in the current snapshot.
    pub async fn fetch_vehicle_by_slug(&self, slug: &str) -> Option<Vehicle> {
        self.fetch_catalog().await.find_by_slug(slug).cloned()
    }

    /// Long description for one listing; empty if unavailable.
    pub async fn fetch_vehicle_description(&self, item_id: &str) -> String {
        self.source.client.get_item_description(item_id).await
    }

    /// The shared rebuild future. It clears the in-flight marker itself once
    /// the new snapshot is published, whichever reader is driving it.
    fn start_build(&self) -> BuildFuture {
        let source = Arc::clone(&self.source);
        let in_flight = Arc::clone(&self.in_flight);

        async move {
            let snapshot = source.build().await;
            *lock(&in_flight) = None;
            snapshot
        }
        .boxed()
        .shared()
    }

    fn is_fresh(&self, snapshot: &CatalogSnapshot) -> bool {
        let max_age = if snapshot.degraded {
            self.retry_after
        } else {
            self.ttl
        };
        // A clock that went backwards counts as fresh.
        let age = (Utc::now() - snapshot.fetched_at).to_std().unwrap_or_default();
        age < max_age
    }
}

impl CatalogSource {
    async fn build(&self) -> Arc<CatalogSnapshot> {
        let snapshot = match self.sync().await {
            Ok(snapshot) => {
                tracing::info!(count = snapshot.vehicles.len(), "Catalog rebuilt");
                snapshot
            }
            Err(e) => {
                tracing::warn!(error = %e, "Catalog sync failed, serving an empty catalog");
                CatalogSnapshot::degraded(Utc::now())
            }
        };

        self.publish(snapshot)
    }

    async fn sync(&self) -> Result<CatalogSnapshot, ListingError> {
        let ids = self.client.list_active_item_ids().await?;
        if ids.is_empty() {
            tracing::info!("Seller has no active listings");
            return Ok(CatalogSnapshot::new(Vec::new(), Utc::now()));
        }

        let results = join_all(ids.iter().map(|id| self.client.get_item_detail(id))).await;

        let items: Vec<RawItem> = ids
            .iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(item_id = %id, error = %e, "Dropping listing from catalog");
                    None
                }
            })
            .collect();

        if items.len() < ids.len() {
            tracing::warn!(
                listed = ids.len(),
                loaded = items.len(),
                "Some listings could not be loaded"
            );
        }

        Ok(CatalogSnapshot::new(assemble_vehicles(&items), Utc::now()))
    }

    fn published(&self) -> Option<Arc<CatalogSnapshot>> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, snapshot: CatalogSnapshot) -> Arc<CatalogSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Arc::clone(&snapshot));
        snapshot
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Normalize `items` and give each a slug unique within the batch.
///
/// A vehicle whose slug is already taken by an earlier one gets its listing
/// id appended, so the earlier vehicle keeps the plain slug.
pub fn assemble_vehicles(items: &[RawItem]) -> Vec<Vehicle> {
    let mut taken = HashSet::new();

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut vehicle = normalize_item(item);
            let mut slug = vehicle_slug(&vehicle, index);

            if taken.contains(&slug) {
                let suffix = to_slug(&vehicle.id);
                let disambiguated = if suffix.is_empty() {
                    format!("{}-{}", slug, index + 1)
                } else {
                    format!("{}-{}", slug, suffix)
                };
                tracing::debug!(
                    item_id = %vehicle.id,
                    slug = %slug,
                    "Slug collision, appending listing id"
                );
                slug = disambiguated;
            }

            taken.insert(slug.clone());
            vehicle.slug = slug;
            vehicle
        })
        .collect()
}
