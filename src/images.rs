//! Ordered collection of hosted images with exactly one primary entry
//! whenever the collection is non-empty.
//!
//! Images only arrive from upload callbacks (see [`crate::upload`]); this module
//! never uploads anything and stores URLs and metadata, not bytes.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ImageError;
use crate::models::{DraftPatch, Image, ImageMetadata};
use crate::store::DraftHandle;

/// Appends `image`, making it primary only if the collection was empty.
pub fn with_added(
    images: &[Image],
    mut image: Image,
    max: usize,
) -> Result<Vec<Image>, ImageError> {
    if images.len() >= max {
        return Err(ImageError::LimitReached { max });
    }
    image.is_primary = images.is_empty();
    let mut next = images.to_vec();
    next.push(image);
    Ok(next)
}

/// Removes `id`; promotes the new first entry if the primary was removed.
/// `None` if no image has that id.
pub fn without(images: &[Image], id: &str) -> Option<Vec<Image>> {
    let position = images.iter().position(|image| image.id == id)?;
    let mut next = images.to_vec();
    let removed = next.remove(position);
    if removed.is_primary {
        if let Some(first) = next.first_mut() {
            first.is_primary = true;
        }
    }
    Some(next)
}

/// Marks `id` as the only primary. `None` if no image has that id.
pub fn with_primary(images: &[Image], id: &str) -> Option<Vec<Image>> {
    if !images.iter().any(|image| image.id == id) {
        return None;
    }
    Some(
        images
            .iter()
            .cloned()
            .map(|mut image| {
                image.is_primary = image.id == id;
                image
            })
            .collect(),
    )
}

/// Image operations on the shared draft, applied through the store's
/// mutation entrypoint.
#[derive(Debug, Clone)]
pub struct ImageCollectionManager {
    handle: DraftHandle,
    max_images: usize,
}

impl ImageCollectionManager {
    pub fn new(handle: DraftHandle, max_images: usize) -> Self {
        Self { handle, max_images }
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    pub fn images(&self) -> Vec<Image> {
        self.handle.read(|store| store.draft().images.clone())
    }

    pub fn remaining(&self) -> usize {
        let count = self.handle.read(|store| store.draft().images.len());
        self.max_images.saturating_sub(count)
    }

    /// Appends a hosted image under a fresh opaque id.
    ///
    /// # Errors
    ///
    /// [`ImageError::LimitReached`] when the collection is full (the draft is
    /// left unchanged); [`ImageError::EmptyUrl`] for a blank URL.
    pub fn add_image(
        &self,
        url: &str,
        metadata: Option<ImageMetadata>,
    ) -> Result<Image, ImageError> {
        self.insert(Uuid::new_v4().to_string(), url, metadata)
    }

    /// Appends an image reported by the upload provider, keeping the
    /// provider's id when it supplied one.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_image`].
    pub fn add_uploaded(
        &self,
        provider_id: Option<&str>,
        url: &str,
        metadata: Option<ImageMetadata>,
    ) -> Result<Image, ImageError> {
        let id = provider_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter(|id| self.images().iter().all(|image| image.id != *id))
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        self.insert(id, url, metadata)
    }

    fn insert(
        &self,
        id: String,
        url: &str,
        metadata: Option<ImageMetadata>,
    ) -> Result<Image, ImageError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ImageError::EmptyUrl);
        }

        let mut image = Image {
            id,
            url: url.to_string(),
            metadata,
            is_primary: false,
        };
        let max = self.max_images;

        let mut is_first = false;
        self.handle
            .try_update(|draft| -> Result<DraftPatch, ImageError> {
                is_first = draft.images.is_empty();
                let images = with_added(&draft.images, image.clone(), max)?;
                Ok(DraftPatch {
                    images: Some(images),
                    ..Default::default()
                })
            })
            .map_err(|e| {
                warn!(error = %e, "Image not added");
                e
            })?;

        image.is_primary = is_first;
        info!(id = %image.id, primary = image.is_primary, "Image added");
        Ok(image)
    }

    /// Removes the image with `id`. Returns whether anything was removed.
    pub fn remove_image(&self, id: &str) -> bool {
        let result = self.handle.try_update(|draft| {
            without(&draft.images, id)
                .map(|images| DraftPatch {
                    images: Some(images),
                    ..Default::default()
                })
                .ok_or(())
        });
        let removed = result.is_ok();
        debug!(id, removed, "Remove image");
        removed
    }

    /// Makes `id` the primary image; no-op for an unknown id.
    pub fn set_primary(&self, id: &str) -> bool {
        let result = self.handle.try_update(|draft| {
            with_primary(&draft.images, id)
                .map(|images| DraftPatch {
                    images: Some(images),
                    ..Default::default()
                })
                .ok_or(())
        });
        result.is_ok()
    }
}
