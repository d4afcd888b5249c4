//! The mounted wizard: one draft store plus the components observing it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::catalog::{CatalogApi, Listing, SubmissionOrchestrator};
use crate::config::WizardConfig;
use crate::error::{PersistenceError, SubmissionError};
use crate::features::{toggled, with_custom_feature, without_custom_feature};
use crate::geocoding::{Geocoder, GeocodingResolver, GeocodingStatus};
use crate::images::ImageCollectionManager;
use crate::models::{CustomFeature, DraftField, DraftPatch, ListingStatus, PropertyDraft};
use crate::persistence::{DraftStorage, PersistenceManager};
use crate::scheduler::lock;
use crate::store::{DraftHandle, DraftListener, DraftStore};
use crate::upload::{UploadCallbacks, UploadWidget};
use crate::wizard::navigator::{self, Progress, StepStatus};
use crate::wizard::{is_step_valid, missing_fields, WizardStep};

/// Owns the draft for as long as the wizard is open.
///
/// Autosave and geocoding subscribe to the store at mount time; both keep
/// their timers only while the session is alive.
pub struct WizardSession {
    handle: DraftHandle,
    persistence: Arc<PersistenceManager>,
    geocoding: Arc<GeocodingResolver>,
    images: ImageCollectionManager,
    submission: SubmissionOrchestrator,
    upload_error: Arc<Mutex<Option<String>>>,
}

impl WizardSession {
    /// Mounts the wizard, restoring the persisted draft when one exists.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(
        config: &WizardConfig,
        storage: Arc<dyn DraftStorage>,
        geocoder: Arc<dyn Geocoder>,
        catalog: Arc<dyn CatalogApi>,
    ) -> Self {
        let persistence = Arc::new(PersistenceManager::new(
            storage,
            config.storage_key(),
            config.autosave_debounce,
        ));

        let (store, restored) = match persistence.restore() {
            Some(record) => (DraftStore::restored(record.draft, record.current_step), true),
            None => (DraftStore::new(), false),
        };
        let handle = DraftHandle::new(store);

        let geocoding = Arc::new(GeocodingResolver::new(geocoder, config.geocode_debounce));

        let autosave: Arc<dyn DraftListener> = persistence.clone();
        handle.subscribe(Arc::downgrade(&autosave));
        let resolver: Arc<dyn DraftListener> = geocoding.clone();
        handle.subscribe(Arc::downgrade(&resolver));

        if restored {
            // A reload may have interrupted a lookup.
            geocoding.on_address_changed(&handle);
        }

        info!(
            key = persistence.key(),
            restored,
            step = ?handle.current_step(),
            "Wizard mounted"
        );

        Self {
            images: ImageCollectionManager::new(handle.clone(), config.max_images),
            submission: SubmissionOrchestrator::new(
                catalog,
                handle.clone(),
                Arc::clone(&persistence),
            ),
            handle,
            persistence,
            geocoding,
            upload_error: Arc::default(),
        }
    }

    pub fn handle(&self) -> &DraftHandle {
        &self.handle
    }

    pub fn draft(&self) -> PropertyDraft {
        self.handle.snapshot()
    }

    pub fn current_step(&self) -> WizardStep {
        self.handle.current_step()
    }

    pub fn update_property_data(&self, patch: DraftPatch) -> Vec<DraftField> {
        self.handle.update_property_data(patch)
    }

    // Navigation

    pub fn go_to_next_step(&self) -> bool {
        self.handle.navigate(navigator::go_to_next_step)
    }

    pub fn go_to_previous_step(&self) -> bool {
        self.handle.navigate(navigator::go_to_previous_step)
    }

    pub fn set_current_step(&self, step: WizardStep) -> bool {
        self.handle
            .navigate(|store| navigator::set_current_step(store, step))
    }

    pub fn is_step_valid(&self, step: WizardStep) -> bool {
        self.handle.read(|store| is_step_valid(step, store.draft()))
    }

    pub fn get_step_status(&self, step: WizardStep) -> StepStatus {
        self.handle
            .read(|store| navigator::step_status(step, store.current_step(), store.draft()))
    }

    pub fn step_statuses(&self) -> Vec<(WizardStep, StepStatus)> {
        self.handle.read(|store| {
            WizardStep::ALL
                .iter()
                .map(|&step| {
                    let status = navigator::step_status(step, store.current_step(), store.draft());
                    (step, status)
                })
                .collect()
        })
    }

    pub fn progress(&self) -> Progress {
        navigator::progress(self.current_step())
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.handle.read(|store| missing_fields(store.draft()))
    }

    // Images

    pub fn images(&self) -> &ImageCollectionManager {
        &self.images
    }

    /// Opens the upload modal. Every successful upload is appended to the
    /// image collection; failures are kept in [`Self::last_upload_error`].
    pub fn open_upload_widget(&self, widget: &dyn UploadWidget) {
        let images = self.images.clone();
        let on_success_error = Arc::clone(&self.upload_error);
        let on_error_error = Arc::clone(&self.upload_error);

        widget.open(UploadCallbacks::new(
            move |url, metadata| {
                let result = images.add_uploaded(
                    metadata.public_id.as_deref(),
                    &url,
                    metadata.image_metadata(),
                );
                *lock(&on_success_error) = result.err().map(|e| e.to_string());
            },
            move |error| {
                warn!(error = %error, "Upload widget reported a failure");
                *lock(&on_error_error) = Some(error.to_string());
            },
        ));
    }

    pub fn last_upload_error(&self) -> Option<String> {
        lock(&self.upload_error).clone()
    }

    // Features

    /// Flips a feature on or off; returns whether it is now selected.
    pub fn toggle_feature(&self, name: &str) -> bool {
        let mut selected = false;
        let result: Result<_, ()> = self.handle.try_update(|draft| {
            let (features, now_selected) = toggled(&draft.features, name);
            selected = now_selected;
            Ok(DraftPatch {
                features: Some(features),
                ..Default::default()
            })
        });
        result.is_ok() && selected
    }

    pub fn add_custom_feature(&self, label: &str) -> Option<CustomFeature> {
        let mut added = None;
        self.handle
            .try_update(|draft| -> Result<DraftPatch, ()> {
                let (features, feature) =
                    with_custom_feature(&draft.custom_features, label).ok_or(())?;
                added = Some(feature);
                Ok(DraftPatch {
                    custom_features: Some(features),
                    ..Default::default()
                })
            })
            .ok()?;
        added
    }

    pub fn remove_custom_feature(&self, id: &str) -> bool {
        self.handle
            .try_update(|draft| {
                without_custom_feature(&draft.custom_features, id)
                    .map(|features| DraftPatch {
                        custom_features: Some(features),
                        ..Default::default()
                    })
                    .ok_or(())
            })
            .is_ok()
    }

    // Geocoding

    pub fn geocoding_status(&self) -> GeocodingStatus {
        self.geocoding.status()
    }

    /// Resolves the current address now, without waiting for the quiet period.
    pub async fn retry_geocoding(&self) {
        self.geocoding.resolve_now(&self.handle).await;
    }

    // Persistence

    /// Writes any pending autosave immediately.
    ///
    /// # Errors
    ///
    /// Returns the storage error when the write fails.
    pub fn flush_pending_save(&self) -> Result<DateTime<Utc>, PersistenceError> {
        self.persistence.flush(&self.handle)
    }

    pub fn has_pending_save(&self) -> bool {
        self.persistence.has_pending_save()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.persistence.last_saved_at()
    }

    pub fn last_save_error(&self) -> Option<String> {
        self.persistence.last_error()
    }

    pub fn delete_draft(&self) {
        self.persistence.delete_draft(&self.handle);
    }

    // Submission

    /// # Errors
    ///
    /// See [`SubmissionOrchestrator::save_draft`].
    pub async fn save_draft(&self) -> Result<Listing, SubmissionError> {
        self.submission.save_draft().await
    }

    /// # Errors
    ///
    /// See [`SubmissionOrchestrator::publish_property`].
    pub async fn publish_property(
        &self,
        status: ListingStatus,
    ) -> Result<Listing, SubmissionError> {
        self.submission.publish_property(status).await
    }

    pub fn reset_property_data(&self) {
        self.submission.reset_property_data();
    }

    /// Cancels pending autosave and geocoding timers. Edits made after the
    /// last completed save are not written.
    pub fn close(&self) {
        let dropped_save = self.persistence.cancel_pending();
        self.geocoding.cancel();
        info!(dropped_save, "Wizard closed");
    }
}

impl std::fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardSession")
            .field("key", &self.persistence.key())
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
