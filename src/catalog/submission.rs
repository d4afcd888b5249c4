//! Sends the draft to the catalog and manages the draft lifecycle around it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::{CatalogApi, Listing};
use crate::error::SubmissionError;
use crate::models::{DraftPatch, ListingStatus};
use crate::persistence::PersistenceManager;
use crate::store::{DraftHandle, DraftStore};
use crate::wizard::ensure_publishable;

/// Clears the in-flight flag when the submission future completes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SubmissionError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SubmissionError::InProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SubmissionOrchestrator {
    catalog: Arc<dyn CatalogApi>,
    handle: DraftHandle,
    persistence: Arc<PersistenceManager>,
    in_flight: AtomicBool,
}

impl SubmissionOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        handle: DraftHandle,
        persistence: Arc<PersistenceManager>,
    ) -> Self {
        Self {
            catalog,
            handle,
            persistence,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stores the draft in the catalog with status `draft`, regardless of
    /// validity. The catalog id is written back so later calls update the
    /// same listing, unless the draft was discarded while the request ran.
    ///
    /// # Errors
    ///
    /// Network or catalog failures; the local draft is left unchanged.
    pub async fn save_draft(&self) -> Result<Listing, SubmissionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let resets = self.handle.read(DraftStore::resets);
        let listing = self.submit(ListingStatus::Draft).await?;
        if self.write_back(resets, &listing) {
            info!(id = %listing.id, "Draft saved to catalog");
        } else {
            info!(id = %listing.id, "Draft discarded during save; catalog id not kept");
        }
        Ok(listing)
    }

    /// Publishes the draft with `status`. Validation runs first; a draft with
    /// missing fields never reaches the network. On success the local draft
    /// and its persisted record are cleared.
    ///
    /// # Errors
    ///
    /// [`SubmissionError::Validation`] lists missing fields in display order;
    /// other variants report network or catalog failures.
    pub async fn publish_property(
        &self,
        status: ListingStatus,
    ) -> Result<Listing, SubmissionError> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        if let Err(e) = self.handle.read(|store| ensure_publishable(store.draft())) {
            warn!(missing = ?e.missing, "Publish blocked by validation");
            return Err(e.into());
        }

        let listing = self.submit(status).await?;
        info!(id = %listing.id, status = ?listing.status, "Listing published");
        self.persistence.delete_draft(&self.handle);
        Ok(listing)
    }

    /// Discards the draft locally and in storage.
    pub fn reset_property_data(&self) {
        self.persistence.delete_draft(&self.handle);
    }

    async fn submit(&self, status: ListingStatus) -> Result<Listing, SubmissionError> {
        let mut draft = self.handle.snapshot();
        draft.status = status;

        let result = match draft.id.clone() {
            Some(id) => self.catalog.update_listing(&id, &draft).await,
            None => self.catalog.create_listing(&draft).await,
        };
        if let Err(e) = &result {
            warn!(
                api = self.catalog.api_name(),
                status = ?status,
                error = %e,
                "Submission failed"
            );
        }
        result
    }

    fn write_back(&self, resets: u64, listing: &Listing) -> bool {
        let patch = DraftPatch {
            id: Some(listing.id.clone()),
            status: Some(listing.status),
            ..Default::default()
        };
        self.handle.update_unless_reset(resets, patch).is_some()
    }
}
