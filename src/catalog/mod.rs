pub mod http;
pub mod submission;
pub mod traits;
pub mod types;

pub use http::HttpCatalogClient;
pub use submission::SubmissionOrchestrator;
pub use traits::CatalogApi;
pub use types::{ApiResponse, Listing};
