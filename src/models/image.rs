use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Hosting metadata reported by the upload provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        alias = "original_filename"
    )]
    pub original_filename: Option<String>,
}

impl ImageMetadata {
    fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.format.is_none()
            && self.original_filename.is_none()
    }
}

/// A hosted listing image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Opaque provider-issued identifier
    pub id: String,
    /// Permanent hosted URL
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Legacy image shapes accepted at the deserialization boundary.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawImage {
    Url(String),
    Object(RawImageObject),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImageObject {
    #[serde(default, alias = "publicId", alias = "public_id")]
    id: Option<String>,
    #[serde(default, alias = "secureUrl", alias = "secure_url")]
    url: Option<String>,
    #[serde(default)]
    metadata: Option<ImageMetadata>,
    #[serde(default, alias = "is_primary")]
    is_primary: bool,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default, alias = "original_filename")]
    original_filename: Option<String>,
}

impl RawImage {
    fn into_image(self, position: usize) -> Option<Image> {
        match self {
            RawImage::Url(url) if !url.trim().is_empty() => Some(Image {
                id: format!("legacy-{position}"),
                url,
                metadata: None,
                is_primary: false,
            }),
            RawImage::Url(_) => None,
            RawImage::Object(raw) => {
                let url = raw.url.filter(|url| !url.trim().is_empty())?;
                let flat = ImageMetadata {
                    width: raw.width,
                    height: raw.height,
                    format: raw.format,
                    original_filename: raw.original_filename,
                };
                let metadata = raw.metadata.or(if flat.is_empty() { None } else { Some(flat) });
                Some(Image {
                    id: raw.id.unwrap_or_else(|| format!("legacy-{position}")),
                    url,
                    metadata,
                    is_primary: raw.is_primary,
                })
            }
        }
    }
}

/// Accepts plain URL strings or provider objects and normalizes them into
/// [`Image`], restoring the single-primary invariant.
pub(crate) fn deserialize_images<'de, D>(deserializer: D) -> Result<Vec<Image>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<RawImage> = Vec::deserialize(deserializer)?;
    let total = raw.len();
    let mut images: Vec<Image> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(position, raw)| raw.into_image(position))
        .collect();

    if images.len() != total {
        warn!(
            dropped = total - images.len(),
            "Dropped stored images without a URL"
        );
    }

    reconcile_primary(&mut images);
    Ok(images)
}

/// Leaves exactly one image marked primary (the first flagged one, else the
/// first image) and returns its index. Returns 0 for an empty collection.
pub fn reconcile_primary(images: &mut [Image]) -> usize {
    if images.is_empty() {
        return 0;
    }

    let primary = images
        .iter()
        .position(|image| image.is_primary)
        .unwrap_or(0);

    for (index, image) in images.iter_mut().enumerate() {
        image.is_primary = index == primary;
    }

    primary
}
