use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::engine::fee::FeeQuote;
use crate::engine::orders::quote_delivery;
use crate::error::AppError;
use crate::models::delivery_config::DeliveryConfig;
use crate::models::location::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery/config", get(get_config).put(update_config))
        .route("/delivery/quote", post(quote))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub destination: Option<GeoPoint>,
    #[serde(default)]
    pub address: Option<String>,
    pub order_total: i64,
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<DeliveryConfig> {
    Json(state.delivery_config().await)
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeliveryConfig>,
) -> Result<Json<DeliveryConfig>, AppError> {
    payload.validate()?;

    *state.delivery_config.write().await = payload.clone();
    info!(
        base_fee = payload.base_fee,
        price_per_km = payload.price_per_km,
        max_delivery_distance_km = payload.max_delivery_distance_km,
        free_delivery_enabled = payload.free_delivery_enabled,
        "delivery config updated"
    );

    Ok(Json(payload))
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<FeeQuote>, AppError> {
    if payload.order_total < 0 {
        return Err(AppError::BadRequest("order_total cannot be negative".to_string()));
    }

    let quote = quote_delivery(
        &state,
        payload.destination,
        payload.address.as_deref(),
        payload.order_total,
    )
    .await?;

    Ok(Json(quote))
}
