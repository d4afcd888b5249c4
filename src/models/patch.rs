use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer};

use super::{CustomFeature, Image, ListingStatus, ListingType, PropertyDraft, PropertyType};

/// Names a single draft field, reported back by a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Id,
    Title,
    Description,
    PropertyType,
    ListingType,
    Price,
    Bedrooms,
    Bathrooms,
    SquareFeet,
    YearBuilt,
    Address,
    City,
    State,
    ZipCode,
    Country,
    ApproximateLocation,
    ShowExactAddress,
    Latitude,
    Longitude,
    ContactEmail,
    PhoneCountryCode,
    PhoneNumber,
    IsPhoneNumberPublic,
    Features,
    CustomFeatures,
    Images,
    PrimaryImageIndex,
    AiSummary,
    Status,
}

impl DraftField {
    /// Fields the geocoding resolver observes.
    pub fn triggers_geocoding(self) -> bool {
        matches!(
            self,
            DraftField::Address
                | DraftField::City
                | DraftField::State
                | DraftField::ZipCode
                | DraftField::Country
                | DraftField::ShowExactAddress
        )
    }
}

/// Partial update for [`PropertyDraft`].
///
/// Every `Some` field replaces the draft's value wholesale; collections are
/// never merged element-wise. Coordinates use a nested option so a patch can
/// clear them (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftPatch {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<PropertyType>,
    pub listing_type: Option<ListingType>,
    pub price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f32>,
    pub square_feet: Option<u32>,
    pub year_built: Option<i32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub approximate_location: Option<String>,
    pub show_exact_address: Option<bool>,
    #[serde(deserialize_with = "nullable")]
    pub latitude: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub longitude: Option<Option<f64>>,
    pub contact_email: Option<String>,
    pub phone_country_code: Option<String>,
    pub phone_number: Option<String>,
    pub is_phone_number_public: Option<bool>,
    pub features: Option<BTreeSet<String>>,
    pub custom_features: Option<Vec<CustomFeature>>,
    #[serde(deserialize_with = "nullable_images")]
    pub images: Option<Vec<Image>>,
    pub primary_image_index: Option<usize>,
    pub ai_summary: Option<String>,
    pub status: Option<ListingStatus>,
}

/// Distinguishes an explicit `null` (clear) from an absent key (keep).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn nullable_images<'de, D>(deserializer: D) -> Result<Option<Vec<Image>>, D::Error>
where
    D: Deserializer<'de>,
{
    super::image::deserialize_images(deserializer).map(Some)
}

macro_rules! merge_fields {
    ($patch:ident, $draft:ident, $changed:ident; $($field:ident => $variant:ident),* $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                if $draft.$field != value {
                    $draft.$field = value;
                    $changed.push(DraftField::$variant);
                }
            }
        )*
    };
}

macro_rules! merge_optional_fields {
    ($patch:ident, $draft:ident, $changed:ident; $($field:ident => $variant:ident),* $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                if $draft.$field.as_ref() != Some(&value) {
                    $draft.$field = Some(value);
                    $changed.push(DraftField::$variant);
                }
            }
        )*
    };
}

impl DraftPatch {
    pub fn is_empty(&self) -> bool {
        self.set_field_count() == 0
    }

    fn set_field_count(&self) -> usize {
        [
            self.id.is_some(),
            self.title.is_some(),
            self.description.is_some(),
            self.property_type.is_some(),
            self.listing_type.is_some(),
            self.price.is_some(),
            self.bedrooms.is_some(),
            self.bathrooms.is_some(),
            self.square_feet.is_some(),
            self.year_built.is_some(),
            self.address.is_some(),
            self.city.is_some(),
            self.state.is_some(),
            self.zip_code.is_some(),
            self.country.is_some(),
            self.approximate_location.is_some(),
            self.show_exact_address.is_some(),
            self.latitude.is_some(),
            self.longitude.is_some(),
            self.contact_email.is_some(),
            self.phone_country_code.is_some(),
            self.phone_number.is_some(),
            self.is_phone_number_public.is_some(),
            self.features.is_some(),
            self.custom_features.is_some(),
            self.images.is_some(),
            self.primary_image_index.is_some(),
            self.ai_summary.is_some(),
            self.status.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Shallow-merges the patch into `draft` and returns the fields whose
    /// value actually changed, in declaration order.
    pub(crate) fn apply_to(self, draft: &mut PropertyDraft) -> Vec<DraftField> {
        let mut changed = Vec::new();
        let patch = self;

        merge_optional_fields!(patch, draft, changed;
            id => Id,
        );
        merge_fields!(patch, draft, changed;
            title => Title,
            description => Description,
        );
        merge_optional_fields!(patch, draft, changed;
            property_type => PropertyType,
            listing_type => ListingType,
        );
        merge_fields!(patch, draft, changed;
            price => Price,
        );
        merge_optional_fields!(patch, draft, changed;
            bedrooms => Bedrooms,
            bathrooms => Bathrooms,
        );
        merge_fields!(patch, draft, changed;
            square_feet => SquareFeet,
        );
        merge_optional_fields!(patch, draft, changed;
            year_built => YearBuilt,
        );
        merge_fields!(patch, draft, changed;
            address => Address,
            city => City,
            state => State,
            zip_code => ZipCode,
            country => Country,
            approximate_location => ApproximateLocation,
            show_exact_address => ShowExactAddress,
            latitude => Latitude,
            longitude => Longitude,
            contact_email => ContactEmail,
            phone_country_code => PhoneCountryCode,
            phone_number => PhoneNumber,
            is_phone_number_public => IsPhoneNumberPublic,
            features => Features,
            custom_features => CustomFeatures,
            images => Images,
            primary_image_index => PrimaryImageIndex,
        );
        merge_optional_fields!(patch, draft, changed;
            ai_summary => AiSummary,
        );
        merge_fields!(patch, draft, changed;
            status => Status,
        );

        changed
    }
}
