use std::collections::HashMap;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::location::GeoPoint;

/// Free-text address lookup. Implementations make a single attempt; callers
/// own caching and timeouts.
pub trait Geocoder: Send + Sync {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<GeoPoint, AppError>>;
}

/// Nominatim-compatible search endpoint.
pub struct HttpGeocoder {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl HttpGeocoder {
    pub fn new(url: impl Into<String>, user_agent: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn search(&self, address: &str) -> Result<GeoPoint, AppError> {
        let hits: Vec<SearchHit> = self
            .client
            .get(&self.url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| AppError::Upstream(format!("geocoding request failed: {err}")))?
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("invalid geocoding response: {err}")))?;

        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("address '{address}' could not be located")))?;

        let point = GeoPoint {
            lat: parse_coordinate(&hit.lat)?,
            lng: parse_coordinate(&hit.lon)?,
        };
        point
            .validate()
            .map_err(|err| AppError::Upstream(format!("geocoder returned bad coordinates: {err}")))?;

        Ok(point)
    }
}

fn parse_coordinate(raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|err| AppError::Upstream(format!("invalid coordinate '{raw}': {err}")))
}

impl Geocoder for HttpGeocoder {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<GeoPoint, AppError>> {
        Box::pin(self.search(address))
    }
}

/// Fixed address book, used when no geocoding service is configured.
#[derive(Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoPoint>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, point: GeoPoint) -> Self {
        self.entries.insert(normalize_address(address), point);
        self
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<GeoPoint, AppError>> {
        let found = self.entries.get(&normalize_address(address)).copied();
        Box::pin(async move {
            found.ok_or_else(|| {
                AppError::NotFound(format!("address '{address}' could not be located"))
            })
        })
    }
}

pub fn normalize_address(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{normalize_address, Geocoder, StaticGeocoder};
    use crate::models::location::GeoPoint;

    #[test]
    fn normalization_ignores_case_and_spacing() {
        assert_eq!(normalize_address("  Main   St 123 "), "main st 123");
    }

    #[tokio::test]
    async fn static_geocoder_resolves_known_addresses() {
        let geocoder = StaticGeocoder::new().with(
            "Main St 123",
            GeoPoint {
                lat: -34.6,
                lng: -58.4,
            },
        );

        let point = geocoder.geocode("main st 123").await.unwrap();
        assert_eq!(point.lat, -34.6);
        assert!(geocoder.geocode("Nowhere 1").await.is_err());
    }
}
