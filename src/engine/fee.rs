use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::delivery_config::DeliveryConfig;
use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeQuote {
    pub fee: i64,
    pub distance_km: f64,
    pub is_free: bool,
}

/// Quote from the store's own location.
pub fn quote(
    config: &DeliveryConfig,
    destination: &GeoPoint,
    order_total: i64,
) -> Result<FeeQuote, AppError> {
    calculate_fee(config, &config.store_location, destination, order_total)
}

pub fn calculate_fee(
    config: &DeliveryConfig,
    origin: &GeoPoint,
    destination: &GeoPoint,
    order_total: i64,
) -> Result<FeeQuote, AppError> {
    let distance_km = haversine_km(origin, destination);

    if distance_km > config.max_delivery_distance_km {
        return Err(AppError::OutOfServiceArea {
            distance_km,
            max_km: config.max_delivery_distance_km,
        });
    }

    if config.free_delivery_enabled && order_total >= config.free_delivery_min_amount {
        return Ok(FeeQuote {
            fee: 0,
            distance_km,
            is_free: true,
        });
    }

    let raw_fee = config.base_fee as f64 + distance_km * config.price_per_km as f64;
    let clamped = raw_fee.clamp(
        config.min_delivery_fee as f64,
        config.max_delivery_fee as f64,
    );

    Ok(FeeQuote {
        fee: clamped.round() as i64,
        distance_km,
        is_free: false,
    })
}
