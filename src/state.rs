use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::engine::tracking::TrackingHub;
use crate::geo::geocode::Geocoder;
use crate::models::delivery_config::DeliveryConfig;
use crate::models::location::GeoPoint;
use crate::models::loyalty::LoyaltyAccount;
use crate::models::order::{Order, OrderEvent};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub delivery_config: RwLock<DeliveryConfig>,
    pub orders: DashMap<Uuid, Order>,
    pub loyalty_accounts: DashMap<Uuid, LoyaltyAccount>,
    pub tracking: Arc<TrackingHub>,
    pub geocoder: Arc<dyn Geocoder>,
    pub geocode_cache: TtlCache<String, GeoPoint>,
    pub order_events_tx: broadcast::Sender<OrderEvent>,
    pub request_timeout: Duration,
    pub code_max_attempts: Option<u32>,
    pub loyalty_points_divisor: i64,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config, geocoder: Arc<dyn Geocoder>) -> Self {
        let metrics = Metrics::new();
        let (order_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));

        Self {
            delivery_config: RwLock::new(config.delivery.clone()),
            orders: DashMap::new(),
            loyalty_accounts: DashMap::new(),
            tracking: Arc::new(TrackingHub::new(
                config.event_buffer_size,
                metrics.clone(),
            )),
            geocoder,
            geocode_cache: TtlCache::new(config.geocode_cache_ttl),
            order_events_tx,
            request_timeout: config.request_timeout,
            code_max_attempts: config.code_max_attempts,
            loyalty_points_divisor: config.loyalty_points_divisor.max(1),
            metrics,
        }
    }

    /// Snapshot of the current delivery settings.
    pub async fn delivery_config(&self) -> DeliveryConfig {
        self.delivery_config.read().await.clone()
    }
}
