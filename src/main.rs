use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use delivery_hub::api;
use delivery_hub::config::{Config, LogFormat};
use delivery_hub::engine::sweeper::run_cache_sweeper;
use delivery_hub::error::AppError;
use delivery_hub::geo::geocode::{Geocoder, HttpGeocoder, StaticGeocoder};
use delivery_hub::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let geocoder: Arc<dyn Geocoder> = match &config.geocoder_url {
        Some(url) => {
            tracing::info!(geocoder_url = %url, "using http geocoder");
            Arc::new(HttpGeocoder::new(url.clone(), &config.geocoder_user_agent)?)
        }
        None => {
            tracing::warn!("GEOCODER_URL not set; addresses without coordinates cannot be located");
            Arc::new(StaticGeocoder::new())
        }
    };

    let shared_state = Arc::new(AppState::new(&config, geocoder));
    let app = api::rest::router(shared_state.clone());

    tokio::spawn(run_cache_sweeper(
        shared_state.clone(),
        config.cache_sweep_interval,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        store_lat = config.delivery.store_location.lat,
        store_lng = config.delivery.store_location.lng,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
