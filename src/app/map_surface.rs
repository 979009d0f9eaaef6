use std::sync::Arc;
use tracing::{debug, info};

use crate::app::ports::{MapHandle, MapProvider, MarkerHandle};
use crate::domain::{Coordinate, ResolvedLocation};
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevels {
    pub wide: u8,
    pub precise: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapWidgetState {
    pub map: Option<MapHandle>,
    pub marker: Option<MarkerHandle>,
    pub last_rendered: Option<Coordinate>,
    pub disposed: bool,
}

/// One widget's map and marker. The map is created at most once and only
/// re-centered afterwards; the marker always lives on that map.
pub struct MapSurface {
    provider: Arc<dyn MapProvider>,
    default_center: Coordinate,
    zoom: ZoomLevels,
    state: MapWidgetState,
}

impl MapSurface {
    pub fn new(provider: Arc<dyn MapProvider>, default_center: Coordinate, zoom: ZoomLevels) -> Self {
        Self {
            provider,
            default_center,
            zoom,
            state: MapWidgetState::default(),
        }
    }

    pub fn state(&self) -> &MapWidgetState {
        &self.state
    }

    pub fn attach(&mut self, container: &str, initial: Option<&ResolvedLocation>) -> Option<MapHandle> {
        if self.state.disposed {
            debug!(container, "Surface already disposed, not attaching");
            return None;
        }
        if let Some(map) = self.state.map {
            return Some(map);
        }

        let map = match initial {
            Some(resolved) => self.provider.create_map(container, resolved.coordinate, self.zoom.precise),
            None => self.provider.create_map(container, self.default_center, self.zoom.wide),
        };
        info!(container, ?map, "Map attached");
        self.state.map = Some(map);

        if initial.is_some() {
            self.update(initial);
        }
        Some(map)
    }

    /// Moves the marker and re-centers when the coordinate actually changed.
    /// Returns whether anything was redrawn.
    pub fn update(&mut self, resolved: Option<&ResolvedLocation>) -> bool {
        let (Some(resolved), Some(map)) = (resolved, self.state.map) else {
            return false;
        };
        if self.state.disposed {
            return false;
        }
        if let Some(last) = &self.state.last_rendered {
            if last.same_position(&resolved.coordinate) {
                debug!(coordinate = %resolved.coordinate, "Coordinate unchanged, skipping re-render");
                return false;
            }
        }

        if let Some(marker) = self.state.marker.take() {
            self.provider.remove_marker(marker);
        }
        let marker = self
            .provider
            .add_marker(map, resolved.coordinate, resolved.label.as_deref());
        self.provider.set_center(map, resolved.coordinate, self.zoom.precise);

        self.state.marker = Some(marker);
        self.state.last_rendered = Some(resolved.coordinate);
        metrics::map::marker_rendered();
        debug!(
            coordinate = %resolved.coordinate,
            precision = resolved.precision.as_str(),
            "Marker placed"
        );
        true
    }

    /// Releases marker then map. Idempotent, and a no-op before attach.
    pub fn dispose(&mut self) {
        if self.state.disposed {
            return;
        }
        self.state.disposed = true;
        if let Some(marker) = self.state.marker.take() {
            self.provider.remove_marker(marker);
        }
        if let Some(map) = self.state.map.take() {
            self.provider.destroy_map(map);
            info!(?map, "Map disposed");
        }
    }
}

impl Drop for MapSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Precision;
    use crate::infra::memory_map::{InMemoryMapProvider, MapEvent};

    const ZOOM: ZoomLevels = ZoomLevels { wide: 12, precise: 15 };
    const DEFAULT: Coordinate = Coordinate { lat: 40.4406, lng: -79.9959 };

    fn located(lat: f64, lng: f64) -> ResolvedLocation {
        ResolvedLocation {
            coordinate: Coordinate { lat, lng },
            precision: Precision::Exact,
            label: Some("Listing".to_string()),
        }
    }

    #[test]
    fn test_attach_without_location_uses_wide_default() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let mut surface = MapSurface::new(provider.clone(), DEFAULT, ZOOM);

        let map = surface.attach("map-1", None).unwrap();

        let view = provider.map(map).unwrap();
        assert_eq!(view.center, DEFAULT);
        assert_eq!(view.zoom, 12);
        assert!(surface.state().marker.is_none());
    }

    #[test]
    fn test_attach_with_location_centers_and_marks() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let mut surface = MapSurface::new(provider.clone(), DEFAULT, ZOOM);

        let map = surface.attach("map-1", Some(&located(40.4432, -79.9428))).unwrap();

        let view = provider.map(map).unwrap();
        assert_eq!(view.center, Coordinate { lat: 40.4432, lng: -79.9428 });
        assert_eq!(view.zoom, 15);
        assert_eq!(surface.state().marker.map(|m| m.map), Some(map));
        assert_eq!(provider.marker_count(), 1);
    }

    #[test]
    fn test_map_is_created_once() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let mut surface = MapSurface::new(provider.clone(), DEFAULT, ZOOM);

        let first = surface.attach("map-1", None);
        let second = surface.attach("map-1", Some(&located(1.0, 1.0)));

        assert_eq!(first, second);
        assert_eq!(provider.map_count(), 1);
    }

    #[test]
    fn test_update_replaces_marker_and_skips_unchanged() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let mut surface = MapSurface::new(provider.clone(), DEFAULT, ZOOM);
        surface.attach("map-1", None);

        assert!(surface.update(Some(&located(1.0, 2.0))));
        assert!(!surface.update(Some(&located(1.0, 2.0))));
        assert!(surface.update(Some(&located(3.0, 4.0))));
        assert!(!surface.update(None));

        assert_eq!(provider.marker_count(), 1);
        assert_eq!(surface.state().last_rendered, Some(Coordinate { lat: 3.0, lng: 4.0 }));
        let removed = provider
            .events()
            .into_iter()
            .filter(|e| matches!(e, MapEvent::MarkerRemoved { .. }))
            .count();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_dispose_releases_everything_and_is_idempotent() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let mut surface = MapSurface::new(provider.clone(), DEFAULT, ZOOM);
        surface.attach("map-1", Some(&located(1.0, 2.0)));

        surface.dispose();
        surface.dispose();

        assert_eq!(provider.map_count(), 0);
        assert_eq!(provider.marker_count(), 0);
        assert!(surface.attach("map-1", None).is_none());
        assert!(!surface.update(Some(&located(5.0, 5.0))));
    }

    #[test]
    fn test_dispose_before_attach_and_drop_are_safe() {
        let provider = Arc::new(InMemoryMapProvider::new());
        let mut unattached = MapSurface::new(provider.clone(), DEFAULT, ZOOM);
        unattached.dispose();
        assert!(provider.events().is_empty());

        {
            let mut surface = MapSurface::new(provider.clone(), DEFAULT, ZOOM);
            surface.attach("map-2", Some(&located(1.0, 2.0)));
        }
        assert_eq!(provider.map_count(), 0);
        assert_eq!(provider.marker_count(), 0);
    }
}
