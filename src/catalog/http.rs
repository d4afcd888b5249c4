use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::catalog::traits::CatalogApi;
use crate::catalog::types::{ApiResponse, Listing};
use crate::error::SubmissionError;
use crate::models::PropertyDraft;

/// JSON-over-HTTP catalog client.
///
/// `POST {base}/properties` creates, `PUT {base}/properties/{id}` updates.
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// # Errors
    ///
    /// Returns [`SubmissionError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        draft: &PropertyDraft,
    ) -> Result<Listing, SubmissionError> {
        debug!(%method, url = %url, status = ?draft.status, "Submitting listing");

        let response = self
            .client
            .request(method, &url)
            .json(draft)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<ApiResponse<Listing>>(&body);

        if !status.is_success() {
            warn!(status = %status, url = %url, "Catalog returned non-success status");
            return Err(match parsed {
                Ok(ApiResponse {
                    error: Some(message),
                    ..
                }) => SubmissionError::Rejected { message },
                _ => SubmissionError::UnexpectedStatus {
                    status: status.as_u16(),
                    url,
                },
            });
        }

        let envelope = parsed.map_err(|source| SubmissionError::Deserialize { source })?;
        match envelope {
            ApiResponse {
                success: true,
                data: Some(listing),
                ..
            } => Ok(listing),
            ApiResponse { success: true, .. } => Err(SubmissionError::Rejected {
                message: "response did not include the listing".to_string(),
            }),
            ApiResponse { error, .. } => Err(SubmissionError::Rejected {
                message: error.unwrap_or_else(|| "request was not accepted".to_string()),
            }),
        }
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn create_listing(&self, draft: &PropertyDraft) -> Result<Listing, SubmissionError> {
        let url = format!("{}/properties", self.base_url);
        self.send(Method::POST, url, draft).await
    }

    async fn update_listing(
        &self,
        id: &str,
        draft: &PropertyDraft,
    ) -> Result<Listing, SubmissionError> {
        let url = format!("{}/properties/{}", self.base_url, id);
        self.send(Method::PUT, url, draft).await
    }

    fn api_name(&self) -> &'static str {
        "http"
    }
}
