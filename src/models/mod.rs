mod image;
mod patch;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use image::{reconcile_primary, Image, ImageMetadata};
pub use patch::{DraftField, DraftPatch};

/// Kind of property being listed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    Condo,
    Townhouse,
    Villa,
    Land,
    Commercial,
}

/// Whether the property is offered for sale or for rent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sell,
    Rent,
}

/// Catalog status of a listing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Draft,
    Pending,
    Active,
}

/// A free-text feature entered by the operator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomFeature {
    pub id: String,
    pub label: String,
}

/// The listing under construction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyDraft {
    /// Catalog identifier, present once the catalog has accepted the listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub price: f64,
    pub bedrooms: Option<u32>,
    /// Half-steps allowed (1.5 bathrooms)
    pub bathrooms: Option<f32>,
    pub square_feet: u32,
    pub year_built: Option<i32>,

    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    /// Shown instead of the street address when exact address is hidden
    pub approximate_location: String,
    pub show_exact_address: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub contact_email: String,
    pub phone_country_code: String,
    pub phone_number: String,
    pub is_phone_number_public: bool,

    pub features: BTreeSet<String>,
    pub custom_features: Vec<CustomFeature>,
    #[serde(deserialize_with = "image::deserialize_images")]
    pub images: Vec<Image>,
    pub primary_image_index: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    pub status: ListingStatus,
}

impl Default for PropertyDraft {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            property_type: None,
            listing_type: None,
            price: 0.0,
            bedrooms: None,
            bathrooms: None,
            square_feet: 0,
            year_built: None,
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            country: String::new(),
            approximate_location: String::new(),
            show_exact_address: true,
            latitude: None,
            longitude: None,
            contact_email: String::new(),
            phone_country_code: String::new(),
            phone_number: String::new(),
            is_phone_number_public: false,
            features: BTreeSet::new(),
            custom_features: Vec::new(),
            images: Vec::new(),
            primary_image_index: 0,
            ai_summary: None,
            status: ListingStatus::Draft,
        }
    }
}

impl PropertyDraft {
    /// True when both coordinates are present and inside the WGS84 ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => valid_coordinates(lat, lng),
            _ => false,
        }
    }

    /// Address components joined with ", ", skipping empty ones.
    pub fn composed_address(&self) -> String {
        [
            &self.address,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.country,
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}
