use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::GeocodingError;
use crate::geocoding::traits::{Coordinates, Geocoder};
use crate::models::valid_coordinates;

/// One entry of a Nominatim `/search` response.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Create a geocoder against `base_url` (e.g. `https://nominatim.openstreetmap.org`).
    ///
    /// # Errors
    ///
    /// Returns [`GeocodingError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn parse_coordinate(raw: &str, axis: &str) -> Result<f64, GeocodingError> {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| GeocodingError::InvalidResponse {
                reason: format!("{axis} {raw:?}: {e}"),
            })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodingError> {
        let url = format!("{}/search", self.base_url);
        debug!(address, "Geocoding address");

        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Geocoder returned non-success status");
            return Err(GeocodingError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let place = places.first().ok_or_else(|| GeocodingError::NoMatch {
            address: address.to_string(),
        })?;

        let latitude = Self::parse_coordinate(&place.lat, "latitude")?;
        let longitude = Self::parse_coordinate(&place.lon, "longitude")?;
        if !valid_coordinates(latitude, longitude) {
            return Err(GeocodingError::InvalidResponse {
                reason: format!("({latitude}, {longitude}) out of range"),
            });
        }

        debug!(address, display_name = %place.display_name, latitude, longitude, "Geocoded");
        Ok(Coordinates {
            latitude,
            longitude,
        })
    }

    fn provider_name(&self) -> &'static str {
        "Nominatim"
    }
}
