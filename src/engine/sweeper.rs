use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::AppState;

/// Periodically drops expired geocoding results so the cache does not grow
/// with addresses nobody asks for again.
pub async fn run_cache_sweeper(state: Arc<AppState>, every: Duration) {
    info!(interval_secs = every.as_secs(), "cache sweeper started");

    let mut ticker = interval(every.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let purged = state.geocode_cache.purge_expired();
        if purged > 0 {
            debug!(purged, remaining = state.geocode_cache.len(), "expired geocode entries purged");
        }
    }
}
