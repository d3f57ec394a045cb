use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Distance math does no checking of its own, so every point coming from
    /// a client goes through here first.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(AppError::BadRequest(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::BadRequest(format!(
                "latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::BadRequest(format!(
                "longitude {} is outside [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

/// Latest known position of a driver for one order. Only the newest sample
/// per `(order_id, delivery_user_id)` is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLocation {
    pub order_id: Uuid,
    pub delivery_user_id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationEvent {
    Inserted { location: DeliveryLocation },
    Updated { location: DeliveryLocation },
    Deleted { order_id: Uuid, delivery_user_id: Uuid },
}

impl LocationEvent {
    pub fn location(&self) -> Option<&DeliveryLocation> {
        match self {
            LocationEvent::Inserted { location } | LocationEvent::Updated { location } => {
                Some(location)
            }
            LocationEvent::Deleted { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LocationEvent::Inserted { .. } => "inserted",
            LocationEvent::Updated { .. } => "updated",
            LocationEvent::Deleted { .. } => "deleted",
        }
    }
}
