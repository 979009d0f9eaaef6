//! Defaults and fixed vocabularies shared across the engine.

// Reference point used when nothing better is known (Pittsburgh city center)
pub const DEFAULT_LATITUDE: f64 = 40.4406;
pub const DEFAULT_LONGITUDE: f64 = -79.9959;

/// Zoom used before any listing coordinate is known.
pub const WIDE_ZOOM: u8 = 12;
/// Zoom used once a marker is placed.
pub const PRECISE_ZOOM: u8 = 15;

pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_GEOCODE_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Geocoder place types that count as a street-level match.
pub const STREET_LEVEL_PLACE_TYPES: &[&str] = &["street_address", "premise", "subpremise"];

// Environment variable names
pub const ENV_CONFIG_PATH: &str = "LISTING_MAP_CONFIG";
pub const ENV_MAPS_API_KEY: &str = "MAPS_API_KEY";
pub const ENV_MAPS_BASE_URL: &str = "MAPS_BASE_URL";
pub const ENV_API_BASE_URL: &str = "API_BASE_URL";
pub const ENV_METRICS_ADDR: &str = "LISTING_MAP_METRICS_ADDR";

/// Returns true when any of `place_types` is a street-level match.
pub fn is_street_level(place_types: &[String]) -> bool {
    place_types
        .iter()
        .any(|t| STREET_LEVEL_PLACE_TYPES.contains(&t.as_str()))
}
