use async_trait::async_trait;

use crate::domain::Coordinate;
use crate::error::{GeocodeFailure, LoadFailure};

/// The single external operation that makes the mapping capability usable.
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    async fn load(&self) -> Result<(), LoadFailure>;
}

/// Geocoding backend. `Ok(vec![])` means the backend answered with zero results.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeMatch>, GeocodeFailure>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeMatch {
    pub lat: f64,
    pub lng: f64,
    pub place_types: Vec<String>,
    pub formatted_address: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MapHandle(pub u64);

/// A marker always remembers the map it was placed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MarkerHandle {
    pub id: u64,
    pub map: MapHandle,
}

/// The map/marker operations the engine needs from a mapping backend.
pub trait MapProvider: Send + Sync {
    fn create_map(&self, container: &str, center: Coordinate, zoom: u8) -> MapHandle;
    fn set_center(&self, map: MapHandle, center: Coordinate, zoom: u8);
    fn add_marker(&self, map: MapHandle, position: Coordinate, label: Option<&str>) -> MarkerHandle;
    fn remove_marker(&self, marker: MarkerHandle);
    fn destroy_map(&self, map: MapHandle);
}
