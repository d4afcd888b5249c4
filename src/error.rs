use thiserror::Error;

/// Required fields are missing; resolved locally, never sent to the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", .missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("draft record for key {key} could not be encoded or decoded: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage quota exceeded for key {key}")]
    QuotaExceeded { key: String },
}

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from geocoder")]
    UnexpectedStatus { status: u16 },

    #[error("no match for address \"{address}\"")]
    NoMatch { address: String },

    #[error("invalid coordinates in geocoder response: {reason}")]
    InvalidResponse { reason: String },
}

/// Failure reported by the external upload widget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upload failed: {message}")]
pub struct UploadError {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("image limit reached ({max} images)")]
    LimitReached { max: usize },

    #[error("image URL is empty")]
    EmptyUrl,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog rejected the listing: {message}")]
    Rejected { message: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("catalog response could not be decoded: {source}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("a submission is already in progress")]
    InProgress,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
