use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::models::delivery_config::DeliveryConfig;
use crate::models::location::GeoPoint;

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub request_timeout: Duration,
    pub geocoder_url: Option<String>,
    pub geocoder_user_agent: String,
    pub geocode_cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    /// Unlimited when `None`.
    pub code_max_attempts: Option<u32>,
    pub loyalty_points_divisor: i64,
    pub delivery: DeliveryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            request_timeout: Duration::from_secs(15),
            geocoder_url: None,
            geocoder_user_agent: "delivery-hub/0.1".to_string(),
            geocode_cache_ttl: Duration::from_secs(3600),
            cache_sweep_interval: Duration::from_secs(60),
            code_max_attempts: None,
            loyalty_points_divisor: 100,
            delivery: DeliveryConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        let default_delivery = defaults.delivery.clone();

        let delivery = DeliveryConfig {
            store_location: GeoPoint {
                lat: parse_or_default("STORE_LAT", default_delivery.store_location.lat)?,
                lng: parse_or_default("STORE_LNG", default_delivery.store_location.lng)?,
            },
            base_fee: parse_or_default("DELIVERY_BASE_FEE", default_delivery.base_fee)?,
            price_per_km: parse_or_default("DELIVERY_PRICE_PER_KM", default_delivery.price_per_km)?,
            min_delivery_fee: parse_or_default("DELIVERY_MIN_FEE", default_delivery.min_delivery_fee)?,
            max_delivery_fee: parse_or_default("DELIVERY_MAX_FEE", default_delivery.max_delivery_fee)?,
            free_delivery_enabled: parse_or_default(
                "FREE_DELIVERY_ENABLED",
                default_delivery.free_delivery_enabled,
            )?,
            free_delivery_min_amount: parse_or_default(
                "FREE_DELIVERY_MIN_AMOUNT",
                default_delivery.free_delivery_min_amount,
            )?,
            max_delivery_distance_km: parse_or_default(
                "MAX_DELIVERY_DISTANCE_KM",
                default_delivery.max_delivery_distance_km,
            )?,
            min_order_amount: parse_or_default("MIN_ORDER_AMOUNT", default_delivery.min_order_amount)?,
        };
        delivery
            .validate()
            .map_err(|err| AppError::Internal(format!("invalid delivery config: {err}")))?;

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {other}, expected compact/json"
                )));
            }
        };

        let loyalty_points_divisor: i64 =
            parse_or_default("LOYALTY_POINTS_DIVISOR", defaults.loyalty_points_divisor)?;
        if loyalty_points_divisor <= 0 {
            return Err(AppError::Internal(
                "invalid LOYALTY_POINTS_DIVISOR: must be > 0".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            request_timeout: Duration::from_secs(parse_or_default(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            geocoder_url: env::var("GEOCODER_URL").ok().filter(|url| !url.trim().is_empty()),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or(defaults.geocoder_user_agent),
            geocode_cache_ttl: Duration::from_secs(parse_or_default(
                "GEOCODE_CACHE_TTL_SECS",
                defaults.geocode_cache_ttl.as_secs(),
            )?),
            cache_sweep_interval: Duration::from_secs(parse_or_default(
                "CACHE_SWEEP_INTERVAL_SECS",
                defaults.cache_sweep_interval.as_secs(),
            )?),
            code_max_attempts: parse_optional("CODE_MAX_ATTEMPTS")?,
            loyalty_points_divisor,
            delivery,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}
