use async_trait::async_trait;

use crate::catalog::types::Listing;
use crate::error::SubmissionError;
use crate::models::PropertyDraft;

/// Remote catalog that stores listings.
/// The draft's `status` field carries the requested catalog status.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Create a new listing from the draft
    async fn create_listing(&self, draft: &PropertyDraft) -> Result<Listing, SubmissionError>;

    /// Replace the listing `id` with the draft's contents
    async fn update_listing(
        &self,
        id: &str,
        draft: &PropertyDraft,
    ) -> Result<Listing, SubmissionError>;

    /// Get the name of the catalog backend
    fn api_name(&self) -> &'static str;
}
