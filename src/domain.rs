use crate::error::{LocatorError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A point on the map in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting non-finite or out-of-range values
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        let coordinate = Self { lat, lng };
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(LocatorError::InvalidQuery(format!(
                "coordinate ({}, {}) is out of range",
                lat, lng
            )))
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Bitwise equality on both axes. Used to decide whether a marker has to move.
    pub fn same_position(&self, other: &Coordinate) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lng.to_bits() == other.lng.to_bits()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// Confidence tag attached to a resolved coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    /// Stored coordinate or a street-level geocode match
    Exact,
    /// Geocode match at a coarser granularity (locality, postal code, ...)
    Approximate,
    /// Default coordinate used after a failed or empty geocode
    Fallback,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Exact => "exact",
            Precision::Approximate => "approximate",
            Precision::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub precision: Precision,
    pub label: Option<String>,
}

/// Location fields of a listing as handed to a map widget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl ListingLocation {
    pub fn from_coordinate(lat: f64, lng: f64) -> Self {
        Self {
            latitude: Some(lat),
            longitude: Some(lng),
            ..Self::default()
        }
    }

    /// Non-empty address parts in address, city, state, zip order
    pub fn address_parts(&self) -> Vec<String> {
        [&self.address, &self.city, &self.state, &self.zip]
            .into_iter()
            .flatten()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressQuery {
    pub parts: Vec<String>,
}

/// What a widget asks the engine to resolve
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinate {
        coordinate: Coordinate,
        label: Option<String>,
    },
    Address(AddressQuery),
    Empty,
}

impl LocationQuery {
    /// Picks the authoritative source: a valid stored coordinate wins,
    /// then the address, otherwise there is nothing to resolve.
    pub fn from_listing(listing: &ListingLocation) -> Self {
        let parts = listing.address_parts();

        if let (Some(lat), Some(lng)) = (listing.latitude, listing.longitude) {
            match Coordinate::new(lat, lng) {
                Ok(coordinate) => {
                    let label = if parts.is_empty() {
                        None
                    } else {
                        Some(join_parts(&parts))
                    };
                    return LocationQuery::Coordinate { coordinate, label };
                }
                Err(e) => debug!("Ignoring stored coordinate: {}", e),
            }
        }

        if parts.is_empty() {
            LocationQuery::Empty
        } else {
            LocationQuery::Address(AddressQuery { parts })
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LocationQuery::Empty)
    }
}

/// Joins non-empty, trimmed parts with ", "
pub fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(40.4432, -79.9428).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_same_position_is_bitwise() {
        let a = Coordinate { lat: 0.0, lng: 1.0 };
        let b = Coordinate { lat: -0.0, lng: 1.0 };
        assert!(a.same_position(&a));
        assert!(!a.same_position(&b));
    }

    #[test]
    fn test_address_parts_skip_blank_fields() {
        let listing = ListingLocation {
            address: Some("123 Main St".to_string()),
            city: Some("  ".to_string()),
            state: Some("PA".to_string()),
            zip: None,
            ..ListingLocation::default()
        };
        assert_eq!(listing.address_parts(), vec!["123 Main St", "PA"]);
    }

    #[test]
    fn test_query_prefers_valid_coordinate() {
        let listing = ListingLocation {
            latitude: Some(40.4432),
            longitude: Some(-79.9428),
            address: Some("5000 Forbes Ave".to_string()),
            city: Some("Pittsburgh".to_string()),
            ..ListingLocation::default()
        };
        match LocationQuery::from_listing(&listing) {
            LocationQuery::Coordinate { coordinate, label } => {
                assert_eq!(coordinate, Coordinate { lat: 40.4432, lng: -79.9428 });
                assert_eq!(label.as_deref(), Some("5000 Forbes Ave, Pittsburgh"));
            }
            other => panic!("expected coordinate query, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_coordinate_falls_through_to_address() {
        let listing = ListingLocation {
            latitude: Some(123.0),
            longitude: Some(-79.9),
            city: Some("Pittsburgh".to_string()),
            ..ListingLocation::default()
        };
        assert_eq!(
            LocationQuery::from_listing(&listing),
            LocationQuery::Address(AddressQuery {
                parts: vec!["Pittsburgh".to_string()]
            })
        );
    }

    #[test]
    fn test_half_coordinate_and_no_address_is_empty() {
        let listing = ListingLocation {
            latitude: Some(40.0),
            ..ListingLocation::default()
        };
        assert!(LocationQuery::from_listing(&listing).is_empty());
        assert!(LocationQuery::from_listing(&ListingLocation::default()).is_empty());
    }
}
