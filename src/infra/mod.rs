pub mod email_client;
pub mod maps_api;
pub mod memory_map;

use std::sync::Arc;
use tracing::info;

use crate::app::engine::LocationResolutionEngine;
use crate::app::geocoding::GeocodingResolver;
use crate::app::loader::{self, ResourceLoader};
use crate::app::map_surface::ZoomLevels;
use crate::app::ports::MapProvider;
use crate::app::widget::WidgetContext;
use crate::config::Config;
use crate::error::{LoadFailure, Result};
use maps_api::{HttpCapabilitySource, HttpGeocoder};

/// Wires the HTTP adapters into a widget context and installs the
/// process-wide loader. Without an API key the loader starts out failed.
pub fn build_widget_context(config: &Config, provider: Arc<dyn MapProvider>) -> Result<WidgetContext> {
    let maps = &config.maps;
    let default_center = maps.default_center()?;
    let client = reqwest::Client::builder()
        .timeout(maps.geocode_timeout())
        .build()?;

    let loader = match maps.api_key() {
        Some(key) => {
            info!(base_url = %maps.base_url, "Maps API key configured");
            ResourceLoader::new(
                Arc::new(HttpCapabilitySource::new(client.clone(), &maps.base_url, key)),
                maps.load_timeout(),
            )
        }
        None => ResourceLoader::disabled(LoadFailure::MissingApiKey),
    };
    let loader = loader::install_global(loader);

    let geocoder = Arc::new(HttpGeocoder::new(
        client,
        &maps.base_url,
        maps.api_key().unwrap_or_default(),
    ));
    let engine = LocationResolutionEngine::new(GeocodingResolver::new(
        Arc::clone(&loader),
        geocoder,
        default_center,
    ));

    Ok(WidgetContext {
        engine: Arc::new(engine),
        loader,
        provider,
        default_center,
        zoom: ZoomLevels {
            wide: maps.wide_zoom,
            precise: maps.precise_zoom,
        },
    })
}
