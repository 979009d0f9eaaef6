use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::app::loader::ResourceLoader;
use crate::app::ports::{GeocodeMatch, Geocoder};
use crate::constants::is_street_level;
use crate::domain::{join_parts, Coordinate, Precision, ResolvedLocation};
use crate::error::GeocodeFailure;
use crate::metrics;

/// Resolves free-text addresses to coordinates. Never fails: anything that
/// goes wrong degrades to the fallback coordinate.
pub struct GeocodingResolver {
    loader: Arc<ResourceLoader>,
    geocoder: Arc<dyn Geocoder>,
    fallback: Coordinate,
}

impl GeocodingResolver {
    pub fn new(loader: Arc<ResourceLoader>, geocoder: Arc<dyn Geocoder>, fallback: Coordinate) -> Self {
        Self {
            loader,
            geocoder,
            fallback,
        }
    }

    pub async fn resolve(&self, parts: &[String]) -> ResolvedLocation {
        let query = join_parts(parts);
        if query.is_empty() {
            debug!("Empty address query, using fallback");
            return self.fallback_location(None);
        }

        if let Err(e) = self.loader.ensure_loaded().await {
            warn!(%query, "Geocoding unavailable: {}", e);
            return self.fallback_location(Some(query));
        }

        metrics::geocode::request();
        let resolved = match self.geocoder.geocode(&query).await {
            Ok(matches) => match classify(&matches) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(%query, "Geocoding gave no usable result: {}", e);
                    self.fallback_location(Some(query.clone()))
                }
            },
            Err(e) => {
                warn!(%query, "Geocoding failed: {}", e);
                self.fallback_location(Some(query.clone()))
            }
        };

        info!(
            %query,
            precision = resolved.precision.as_str(),
            coordinate = %resolved.coordinate,
            "Address resolved"
        );
        metrics::geocode::resolved(resolved.precision);
        resolved
    }

    fn fallback_location(&self, label: Option<String>) -> ResolvedLocation {
        ResolvedLocation {
            coordinate: self.fallback,
            precision: Precision::Fallback,
            label,
        }
    }
}

/// Turns the geocoder's matches into a location, looking only at the top one.
fn classify(matches: &[GeocodeMatch]) -> Result<ResolvedLocation, GeocodeFailure> {
    let top = matches.first().ok_or(GeocodeFailure::NoResults)?;
    let coordinate = Coordinate::new(top.lat, top.lng).map_err(|_| GeocodeFailure::InvalidCoordinate {
        lat: top.lat,
        lng: top.lng,
    })?;

    let precision = if is_street_level(&top.place_types) {
        Precision::Exact
    } else {
        Precision::Approximate
    };

    Ok(ResolvedLocation {
        coordinate,
        precision,
        label: top.formatted_address.clone(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::app::loader::tests::CountingSource;
    use crate::error::LoadFailure;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Geocoder answering from a fixed table, recording every query it sees
    pub(crate) struct StubGeocoder {
        answers: HashMap<String, Result<Vec<GeocodeMatch>, GeocodeFailure>>,
        delays: HashMap<String, Duration>,
        pub queries: Mutex<Vec<String>>,
    }

    impl StubGeocoder {
        pub(crate) fn new() -> Self {
            Self {
                answers: HashMap::new(),
                delays: HashMap::new(),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn answer(mut self, query: &str, result: Result<Vec<GeocodeMatch>, GeocodeFailure>) -> Self {
            self.answers.insert(query.to_string(), result);
            self
        }

        pub(crate) fn delay(mut self, query: &str, delay: Duration) -> Self {
            self.delays.insert(query.to_string(), delay);
            self
        }

        pub(crate) fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, query: &str) -> Result<Vec<GeocodeMatch>, GeocodeFailure> {
            self.queries.lock().unwrap().push(query.to_string());
            if let Some(delay) = self.delays.get(query) {
                tokio::time::sleep(*delay).await;
            }
            self.answers.get(query).cloned().unwrap_or(Ok(Vec::new()))
        }
    }

    pub(crate) fn street_match(lat: f64, lng: f64) -> GeocodeMatch {
        GeocodeMatch {
            lat,
            lng,
            place_types: vec!["street_address".to_string()],
            formatted_address: Some("123 Main St, Pittsburgh, PA 15213, USA".to_string()),
        }
    }

    pub(crate) fn loaded_loader() -> Arc<ResourceLoader> {
        Arc::new(ResourceLoader::new(
            CountingSource::new(Duration::ZERO, Ok(())),
            Duration::from_secs(5),
        ))
    }

    fn fallback() -> Coordinate {
        Coordinate { lat: 40.4406, lng: -79.9959 }
    }

    fn parts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_street_address_is_exact() {
        let geocoder = Arc::new(
            StubGeocoder::new().answer("123 Main St, Pittsburgh, PA", Ok(vec![street_match(40.44, -79.95)])),
        );
        let resolver = GeocodingResolver::new(loaded_loader(), geocoder.clone(), fallback());

        let resolved = resolver.resolve(&parts(&["123 Main St", "Pittsburgh", "PA"])).await;

        assert_eq!(resolved.precision, Precision::Exact);
        assert_eq!(resolved.coordinate, Coordinate { lat: 40.44, lng: -79.95 });
        assert_eq!(geocoder.queries(), vec!["123 Main St, Pittsburgh, PA"]);
    }

    #[tokio::test]
    async fn test_locality_is_approximate() {
        let locality = GeocodeMatch {
            lat: 40.4406,
            lng: -79.9959,
            place_types: vec!["locality".to_string(), "political".to_string()],
            formatted_address: Some("Pittsburgh, PA, USA".to_string()),
        };
        let geocoder = Arc::new(StubGeocoder::new().answer("Pittsburgh, PA", Ok(vec![locality])));
        let resolver = GeocodingResolver::new(loaded_loader(), geocoder, fallback());

        let resolved = resolver.resolve(&parts(&["Pittsburgh", "PA"])).await;

        assert_eq!(resolved.precision, Precision::Approximate);
        assert_eq!(resolved.label.as_deref(), Some("Pittsburgh, PA, USA"));
    }

    #[tokio::test]
    async fn test_premise_counts_as_street_level() {
        let premise = GeocodeMatch {
            place_types: vec!["premise".to_string()],
            ..street_match(40.1, -80.1)
        };
        let geocoder = Arc::new(StubGeocoder::new().answer("Cathedral of Learning", Ok(vec![premise])));
        let resolver = GeocodingResolver::new(loaded_loader(), geocoder, fallback());

        let resolved = resolver.resolve(&parts(&["Cathedral of Learning"])).await;
        assert_eq!(resolved.precision, Precision::Exact);
    }

    #[tokio::test]
    async fn test_zero_results_fall_back_without_retry() {
        let geocoder = Arc::new(StubGeocoder::new());
        let resolver = GeocodingResolver::new(loaded_loader(), geocoder.clone(), fallback());

        let resolved = resolver.resolve(&parts(&["Nowhere Lane"])).await;

        assert_eq!(resolved.precision, Precision::Fallback);
        assert_eq!(resolved.coordinate, fallback());
        assert_eq!(geocoder.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_errors_fall_back() {
        let geocoder = Arc::new(
            StubGeocoder::new()
                .answer(
                    "denied",
                    Err(GeocodeFailure::Status {
                        status: "REQUEST_DENIED".to_string(),
                        message: "bad key".to_string(),
                    }),
                )
                .answer("broken", Err(GeocodeFailure::Transport("connection reset".to_string())))
                .answer("off the map", Ok(vec![street_match(95.0, 10.0)])),
        );
        let resolver = GeocodingResolver::new(loaded_loader(), geocoder, fallback());

        for query in ["denied", "broken", "off the map"] {
            let resolved = resolver.resolve(&parts(&[query])).await;
            assert_eq!(resolved.precision, Precision::Fallback, "query {}", query);
            assert_eq!(resolved.coordinate, fallback());
        }
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_without_geocoding() {
        let loader = Arc::new(ResourceLoader::disabled(LoadFailure::MissingApiKey));
        let geocoder = Arc::new(StubGeocoder::new().answer("123 Main St", Ok(vec![street_match(40.44, -79.95)])));
        let resolver = GeocodingResolver::new(loader, geocoder.clone(), fallback());

        let resolved = resolver.resolve(&parts(&["123 Main St"])).await;

        assert_eq!(resolved.precision, Precision::Fallback);
        assert!(geocoder.queries().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_is_deterministic_for_stubbed_backend() {
        let geocoder = Arc::new(StubGeocoder::new().answer("1 Penn Ave", Ok(vec![street_match(40.4, -80.0)])));
        let resolver = GeocodingResolver::new(loaded_loader(), geocoder, fallback());

        let first = resolver.resolve(&parts(&["1 Penn Ave"])).await;
        let second = resolver.resolve(&parts(&["1 Penn Ave"])).await;
        assert_eq!(first, second);
    }
}
