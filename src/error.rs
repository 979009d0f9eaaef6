use std::time::Duration;
use thiserror::Error;

/// Why the mapping capability could not be loaded. Terminal for the loader
/// that produced it, so it is cloned out to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    #[error("maps API key is not configured")]
    MissingApiKey,

    #[error("mapping capability did not load within {0:?}")]
    Timeout(Duration),

    #[error("mapping capability rejected: {0}")]
    Rejected(String),

    #[error("loader was reset before the load settled")]
    Reset,
}

impl LoadFailure {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            LoadFailure::MissingApiKey => "missing_api_key",
            LoadFailure::Timeout(_) => "timeout",
            LoadFailure::Rejected(_) => "rejected",
            LoadFailure::Reset => "reset",
        }
    }
}

/// Failure of a single geocoding attempt. Never reaches a caller of the
/// resolver; it is logged and downgraded to a fallback location.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeFailure {
    #[error("geocoder returned no results")]
    NoResults,

    #[error("geocoder returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("geocoding transport error: {0}")]
    Transport(String),

    #[error("geocoder returned out-of-range coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {message}")]
    Api { message: String },
}

pub type Result<T> = std::result::Result<T, LocatorError>;
