use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GeocodingError;

/// A resolved point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Address-to-coordinate provider.
/// Implementations perform one request per call and never retry on their own.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a composed address string.
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodingError>;

    /// Get the name of the provider
    fn provider_name(&self) -> &'static str;
}
