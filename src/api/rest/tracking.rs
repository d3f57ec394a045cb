use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, put};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::orders::{self, TrackingSnapshot};
use crate::error::AppError;
use crate::models::location::{GeoPoint, LocationEvent};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/:id/location", put(update_location))
        .route("/orders/:id/location/:driver_id", delete(stop_location))
        .route("/orders/:id/tracking", get(get_tracking))
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub delivery_user_id: Uuid,
    pub location: GeoPoint,
}

#[derive(Serialize)]
pub struct StopLocationResponse {
    pub removed: bool,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<LocationEvent>, AppError> {
    let event = orders::record_location(&state, id, payload.delivery_user_id, payload.location)?;
    Ok(Json(event))
}

async fn stop_location(
    State(state): State<Arc<AppState>>,
    Path((id, driver_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<StopLocationResponse>, AppError> {
    let removed = orders::stop_location(&state, id, driver_id)?;
    Ok(Json(StopLocationResponse { removed }))
}

async fn get_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingSnapshot>, AppError> {
    Ok(Json(orders::tracking_snapshot(&state, id).await?))
}
