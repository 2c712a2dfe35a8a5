// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical vehicle record and the catalog snapshot that holds them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A single catalog entry built from one marketplace listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Vehicle {
    /// Upstream listing ID (e.g. "MLA1234567890")
    pub id: String,
    /// Derived URL identifier, unique within a snapshot
    pub slug: String,
    pub title: String,
    pub brand: String,
    pub model: String,
    pub version: String,
    pub year: String,
    pub km: String,
    pub color: String,
    pub transmission: String,
    pub engine: String,
    /// Listing price without currency. `None` when upstream did not send a number.
    pub price: Option<f64>,
    /// Upstream thumbnail, verbatim
    pub thumbnail_url: String,
    /// Primary image for cards and previews
    pub image_url: String,
    pub pictures: Vec<Picture>,
    /// Link to the listing on the marketplace
    pub permalink: String,
    /// Upstream attributes not mapped to a field above, keyed by attribute id
    pub raw_attributes: BTreeMap<String, String>,
}

/// One listing picture.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Picture {
    pub url: String,
    pub secure_url: Option<String>,
}

/// Immutable view of the full catalog at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub fetched_at: DateTime<Utc>,
    /// Set when the listing source was unavailable and this snapshot is the
    /// empty fallback.
    pub degraded: bool,
}

impl CatalogSnapshot {
    pub fn new(vehicles: Vec<Vehicle>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            vehicles,
            fetched_at,
            degraded: false,
        }
    }

    pub fn degraded(fetched_at: DateTime<Utc>) -> Self {
        Self {
            vehicles: Vec::new(),
            fetched_at,
            degraded: true,
        }
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.slug == slug)
    }
}
