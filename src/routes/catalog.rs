// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog routes consumed by the website.

use crate::error::{AppError, Result};
use crate::models::Vehicle;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Catalog routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vehicles", get(list_vehicles))
        .route("/api/vehicles/{slug}", get(get_vehicle))
}

/// Full catalog response.
#[derive(Serialize)]
pub struct CatalogResponse {
    pub vehicles: Vec<Vehicle>,
    pub count: usize,
    pub fetched_at: String,
    /// True when the marketplace was unreachable and the list is empty
    pub degraded: bool,
}

/// List every vehicle in the current snapshot.
///
/// Always 200: an unavailable marketplace shows up as an empty, degraded list.
async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    let snapshot = state.catalog.fetch_catalog().await;

    Json(CatalogResponse {
        vehicles: snapshot.vehicles.clone(),
        count: snapshot.vehicles.len(),
        fetched_at: format_utc_rfc3339(snapshot.fetched_at),
        degraded: snapshot.degraded,
    })
}

/// Single vehicle detail response.
#[derive(Serialize)]
pub struct VehicleDetailResponse {
    pub vehicle: Vehicle,
    /// Long listing description, empty if unavailable
    pub description: String,
}

/// Get one vehicle by slug, with its description.
async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<VehicleDetailResponse>> {
    let vehicle = state
        .catalog
        .fetch_vehicle_by_slug(&slug)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {}", slug)))?;

    let description = state.catalog.fetch_vehicle_description(&vehicle.id).await;

    Ok(Json(VehicleDetailResponse {
        vehicle,
        description,
    }))
}
