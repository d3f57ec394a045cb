use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::location::GeoPoint;

/// Store-wide delivery settings. Amounts are whole currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub store_location: GeoPoint,
    pub base_fee: i64,
    pub price_per_km: i64,
    pub min_delivery_fee: i64,
    pub max_delivery_fee: i64,
    pub free_delivery_enabled: bool,
    pub free_delivery_min_amount: i64,
    pub max_delivery_distance_km: f64,
    #[serde(default)]
    pub min_order_amount: i64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            store_location: GeoPoint {
                lat: -34.6037,
                lng: -58.3816,
            },
            base_fee: 800,
            price_per_km: 300,
            min_delivery_fee: 1500,
            max_delivery_fee: 5000,
            free_delivery_enabled: false,
            free_delivery_min_amount: 0,
            max_delivery_distance_km: 10.0,
            min_order_amount: 0,
        }
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        self.store_location.validate()?;

        let amounts = [
            ("base_fee", self.base_fee),
            ("price_per_km", self.price_per_km),
            ("min_delivery_fee", self.min_delivery_fee),
            ("max_delivery_fee", self.max_delivery_fee),
            ("free_delivery_min_amount", self.free_delivery_min_amount),
            ("min_order_amount", self.min_order_amount),
        ];
        if let Some((name, _)) = amounts.iter().find(|(_, value)| *value < 0) {
            return Err(AppError::BadRequest(format!("{name} cannot be negative")));
        }

        if self.min_delivery_fee > self.max_delivery_fee {
            return Err(AppError::BadRequest(
                "min_delivery_fee must be <= max_delivery_fee".to_string(),
            ));
        }

        if !self.max_delivery_distance_km.is_finite() || self.max_delivery_distance_km <= 0.0 {
            return Err(AppError::BadRequest(
                "max_delivery_distance_km must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DeliveryConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(DeliveryConfig::default().validate().is_ok());
    }

    #[test]
    fn min_fee_above_max_fee_is_rejected() {
        let config = DeliveryConfig {
            min_delivery_fee: 6000,
            max_delivery_fee: 5000,
            ..DeliveryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_service_radius_is_rejected() {
        let config = DeliveryConfig {
            max_delivery_distance_km: 0.0,
            ..DeliveryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let config = DeliveryConfig {
            price_per_km: -1,
            ..DeliveryConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
