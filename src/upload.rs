//! Callback protocol of the external upload widget.
//!
//! The widget performs the transfer and reports back a permanent URL; the
//! engine only registers callbacks and turns successful results into images.

use serde::Deserialize;

use crate::error::UploadError;
use crate::models::ImageMetadata;

/// Metadata the widget reports with a successful upload.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    #[serde(default, alias = "public_id")]
    pub public_id: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, alias = "original_filename")]
    pub original_filename: Option<String>,
}

impl UploadMetadata {
    /// Canonical image metadata; `None` when the widget reported nothing useful.
    pub fn image_metadata(&self) -> Option<ImageMetadata> {
        let metadata = ImageMetadata {
            width: self.width,
            height: self.height,
            format: self.format.clone(),
            original_filename: self.original_filename.clone(),
        };
        if metadata == ImageMetadata::default() {
            None
        } else {
            Some(metadata)
        }
    }
}

type SuccessFn = Box<dyn Fn(String, UploadMetadata) + Send + Sync>;
type ErrorFn = Box<dyn Fn(UploadError) + Send + Sync>;

/// Callbacks registered with the widget when it is opened. The widget may
/// invoke them any number of times while it stays open.
pub struct UploadCallbacks {
    on_success: SuccessFn,
    on_error: ErrorFn,
}

impl UploadCallbacks {
    pub fn new(
        on_success: impl Fn(String, UploadMetadata) + Send + Sync + 'static,
        on_error: impl Fn(UploadError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    /// Called by the widget with the hosted URL of a finished upload.
    pub fn success(&self, secure_url: impl Into<String>, metadata: UploadMetadata) {
        (self.on_success)(secure_url.into(), metadata);
    }

    /// Called by the widget when an upload fails.
    pub fn error(&self, error: UploadError) {
        (self.on_error)(error);
    }
}

impl std::fmt::Debug for UploadCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCallbacks").finish_non_exhaustive()
    }
}

/// An externally rendered upload modal.
pub trait UploadWidget: Send + Sync {
    /// Opens the modal; the widget keeps `callbacks` for as long as it needs them.
    fn open(&self, callbacks: UploadCallbacks);
}
