//! Counters for the location-resolution engine.
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use crate::constants::ENV_METRICS_ADDR;
use std::net::SocketAddr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    LoaderAttempts,
    LoaderLoaded,
    LoaderFailed,
    LoaderLateSettle,
    GeocodeRequests,
    GeocodeResolved,
    MapMarkersRendered,
    MapResolutionsDiscarded,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::LoaderAttempts => "listing_map_loader_attempts_total",
            MetricName::LoaderLoaded => "listing_map_loader_loaded_total",
            MetricName::LoaderFailed => "listing_map_loader_failed_total",
            MetricName::LoaderLateSettle => "listing_map_loader_late_settle_total",
            MetricName::GeocodeRequests => "listing_map_geocode_requests_total",
            MetricName::GeocodeResolved => "listing_map_geocode_resolved_total",
            MetricName::MapMarkersRendered => "listing_map_markers_rendered_total",
            MetricName::MapResolutionsDiscarded => "listing_map_resolutions_discarded_total",
        }
    }
}

/// Installs the Prometheus exporter when `LISTING_MAP_METRICS_ADDR` is set.
pub fn init_metrics() {
    let Ok(addr_str) = std::env::var(ENV_METRICS_ADDR) else {
        info!("Metrics exporter disabled ({} not set)", ENV_METRICS_ADDR);
        return;
    };
    let addr: SocketAddr = match addr_str.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics addr '{}': {}", addr_str, e);
            return;
        }
    };
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

pub mod loader {
    use super::MetricName;

    pub fn attempt() {
        ::metrics::counter!(MetricName::LoaderAttempts.as_str()).increment(1);
    }

    pub fn loaded() {
        ::metrics::counter!(MetricName::LoaderLoaded.as_str()).increment(1);
    }

    pub fn failed(reason: &'static str) {
        ::metrics::counter!(MetricName::LoaderFailed.as_str(), "reason" => reason).increment(1);
    }

    /// The underlying load finished after the loader had already settled
    pub fn late_settle() {
        ::metrics::counter!(MetricName::LoaderLateSettle.as_str()).increment(1);
    }
}

pub mod geocode {
    use super::MetricName;
    use crate::domain::Precision;

    pub fn request() {
        ::metrics::counter!(MetricName::GeocodeRequests.as_str()).increment(1);
    }

    pub fn resolved(precision: Precision) {
        ::metrics::counter!(MetricName::GeocodeResolved.as_str(), "precision" => precision.as_str())
            .increment(1);
    }
}

pub mod map {
    use super::MetricName;

    pub fn marker_rendered() {
        ::metrics::counter!(MetricName::MapMarkersRendered.as_str()).increment(1);
    }

    pub fn resolution_discarded() {
        ::metrics::counter!(MetricName::MapResolutionsDiscarded.as_str()).increment(1);
    }
}
