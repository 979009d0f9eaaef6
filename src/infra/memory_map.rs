use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::app::ports::{MapHandle, MapProvider, MarkerHandle};
use crate::domain::Coordinate;

#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub container: String,
    pub center: Coordinate,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub map: MapHandle,
    pub position: Coordinate,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    MapCreated { map: MapHandle, container: String },
    Centered { map: MapHandle, center: Coordinate, zoom: u8 },
    MarkerAdded { marker: MarkerHandle, position: Coordinate },
    MarkerRemoved { marker: MarkerHandle },
    MapDestroyed { map: MapHandle },
}

#[derive(Default)]
struct Scene {
    maps: HashMap<MapHandle, MapView>,
    markers: HashMap<MarkerHandle, MarkerView>,
    events: Vec<MapEvent>,
}

/// Headless map backend that keeps the scene in memory and records every
/// operation. Drives the CLI and the tests.
#[derive(Default)]
pub struct InMemoryMapProvider {
    next_id: AtomicU64,
    scene: Mutex<Scene>,
}

impl InMemoryMapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&self, map: MapHandle) -> Option<MapView> {
        self.scene().maps.get(&map).cloned()
    }

    pub fn markers_on(&self, map: MapHandle) -> Vec<MarkerView> {
        self.scene()
            .markers
            .values()
            .filter(|marker| marker.map == map)
            .cloned()
            .collect()
    }

    pub fn map_count(&self) -> usize {
        self.scene().maps.len()
    }

    pub fn marker_count(&self) -> usize {
        self.scene().markers.len()
    }

    pub fn events(&self) -> Vec<MapEvent> {
        self.scene().events.clone()
    }

    fn scene(&self) -> MutexGuard<'_, Scene> {
        self.scene.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl MapProvider for InMemoryMapProvider {
    fn create_map(&self, container: &str, center: Coordinate, zoom: u8) -> MapHandle {
        let map = MapHandle(self.next_id());
        let mut scene = self.scene();
        scene.maps.insert(
            map,
            MapView {
                container: container.to_string(),
                center,
                zoom,
            },
        );
        scene.events.push(MapEvent::MapCreated {
            map,
            container: container.to_string(),
        });
        debug!(?map, container, "Created map");
        map
    }

    fn set_center(&self, map: MapHandle, center: Coordinate, zoom: u8) {
        let mut scene = self.scene();
        match scene.maps.get_mut(&map) {
            Some(view) => {
                view.center = center;
                view.zoom = zoom;
                scene.events.push(MapEvent::Centered { map, center, zoom });
            }
            None => warn!(?map, "set_center on unknown map"),
        }
    }

    fn add_marker(&self, map: MapHandle, position: Coordinate, label: Option<&str>) -> MarkerHandle {
        let marker = MarkerHandle {
            id: self.next_id(),
            map,
        };
        let mut scene = self.scene();
        scene.markers.insert(
            marker,
            MarkerView {
                map,
                position,
                label: label.map(str::to_string),
            },
        );
        scene.events.push(MapEvent::MarkerAdded { marker, position });
        marker
    }

    fn remove_marker(&self, marker: MarkerHandle) {
        let mut scene = self.scene();
        if scene.markers.remove(&marker).is_some() {
            scene.events.push(MapEvent::MarkerRemoved { marker });
        }
    }

    fn destroy_map(&self, map: MapHandle) {
        let mut scene = self.scene();
        scene.markers.retain(|_, marker| marker.map != map);
        if scene.maps.remove(&map).is_some() {
            scene.events.push(MapEvent::MapDestroyed { map });
        }
    }
}
