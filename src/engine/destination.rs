use std::time::Instant;

use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::AppError;
use crate::geo::geocode::normalize_address;
use crate::models::location::GeoPoint;
use crate::state::AppState;

/// Stored coordinates win; otherwise the address is geocoded once and the
/// result cached. One attempt, bounded by the request timeout.
pub async fn resolve_destination(
    state: &AppState,
    stored: Option<GeoPoint>,
    address: Option<&str>,
) -> Result<GeoPoint, AppError> {
    if let Some(point) = stored {
        point.validate()?;
        return Ok(point);
    }

    let address = address
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest("a destination address or coordinates are required".to_string())
        })?;

    let key = normalize_address(address);
    if let Some(point) = state.geocode_cache.get(&key) {
        debug!(address = %key, "geocode cache hit");
        return Ok(point);
    }

    let start = Instant::now();
    let result = match timeout(state.request_timeout, state.geocoder.geocode(address)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!("geocoding '{address}'"))),
    };

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .geocode_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());

    let point = result?;
    state.geocode_cache.set(key, point);
    info!(address = %address, lat = point.lat, lng = point.lng, "address geocoded");

    Ok(point)
}
