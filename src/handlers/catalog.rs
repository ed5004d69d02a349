use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::models::{GeoPoint, ServiceType, VehicleType};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ServiceOption {
    id: ServiceType,
    name: &'static str,
    price: i64,
}

#[derive(Serialize)]
pub struct VehicleOption {
    id: VehicleType,
    label: &'static str,
}

#[derive(Serialize)]
pub struct CatalogResponse {
    currency: &'static str,
    services: Vec<ServiceOption>,
    vehicle_types: Vec<VehicleOption>,
}

// GET /api/catalog
pub async fn get_catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        currency: "ZAR",
        services: ServiceType::ALL
            .into_iter()
            .map(|s| ServiceOption {
                id: s,
                name: s.display_name(),
                price: s.price(),
            })
            .collect(),
        vehicle_types: VehicleType::ALL
            .into_iter()
            .map(|v| VehicleOption {
                id: v,
                label: v.label(),
            })
            .collect(),
    })
}

// GET /api/location/default
pub async fn default_location(State(state): State<Arc<AppState>>) -> Json<GeoPoint> {
    Json(state.config.default_location)
}
