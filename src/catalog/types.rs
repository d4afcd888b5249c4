use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ListingStatus;

/// Envelope every catalog endpoint responds with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Listing as stored by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
