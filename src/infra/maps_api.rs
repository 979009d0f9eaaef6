use crate::app::ports::{CapabilitySource, GeocodeMatch, Geocoder};
use crate::error::{GeocodeFailure, LoadFailure};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Loads the provider's maps script once; a 2xx with a non-empty body counts as loaded.
pub struct HttpCapabilitySource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpCapabilitySource {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl CapabilitySource for HttpCapabilitySource {
    async fn load(&self) -> Result<(), LoadFailure> {
        let url = format!("{}/maps/api/js", self.base_url);
        debug!(%url, "Requesting maps script");
        let resp = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("libraries", "places")])
            .send()
            .await
            .map_err(|e| LoadFailure::Rejected(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LoadFailure::Rejected(format!("HTTP {}", status.as_u16())));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| LoadFailure::Rejected(e.to_string()))?;
        if bytes.is_empty() {
            return Err(LoadFailure::Rejected("empty maps script".to_string()));
        }
        Ok(())
    }
}

pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGeocoder {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeMatch>, GeocodeFailure> {
        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| GeocodeFailure::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| GeocodeFailure::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(GeocodeFailure::Transport(format!("HTTP {}", status.as_u16())));
        }
        parse_geocode_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// `OK` yields the matches, `ZERO_RESULTS` an empty list, anything else is a failure.
pub fn parse_geocode_response(body: &[u8]) -> Result<Vec<GeocodeMatch>, GeocodeFailure> {
    let response: GeocodeResponse = serde_json::from_slice(body)
        .map_err(|e| GeocodeFailure::Transport(format!("malformed geocode response: {}", e)))?;

    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .into_iter()
            .map(|result| GeocodeMatch {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
                place_types: result.types,
                formatted_address: result.formatted_address,
            })
            .collect()),
        "ZERO_RESULTS" => Ok(Vec::new()),
        _ => Err(GeocodeFailure::Status {
            message: response.error_message.unwrap_or_default(),
            status: response.status,
        }),
    }
}
