use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::engine::{LocationResolutionEngine, Resolution, SequenceGuard};
use crate::app::loader::{LoadState, ResourceLoader};
use crate::app::map_surface::{MapSurface, MapWidgetState, ZoomLevels};
use crate::app::ports::MapProvider;
use crate::domain::{Coordinate, ListingLocation, LocationQuery, ResolvedLocation};
use crate::error::LoadFailure;

/// What the UI should render for a widget
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetView {
    Map(ResolvedLocation),
    NoLocationData,
    LocationUnavailable(LoadFailure),
    /// A newer location update took over before this one finished
    Superseded,
    Disposed,
}

/// Everything a widget needs, shared by all widgets of a process
#[derive(Clone)]
pub struct WidgetContext {
    pub engine: Arc<LocationResolutionEngine>,
    pub loader: Arc<ResourceLoader>,
    pub provider: Arc<dyn MapProvider>,
    pub default_center: Coordinate,
    pub zoom: ZoomLevels,
}

/// One mounted map widget
pub struct MapWidget {
    id: Uuid,
    engine: Arc<LocationResolutionEngine>,
    loader: Arc<ResourceLoader>,
    guard: SequenceGuard,
    surface: Mutex<MapSurface>,
    view: Mutex<WidgetView>,
}

impl MapWidget {
    /// Waits for the mapping capability, creates the map and applies the
    /// initial props. A failed load leaves the widget without a map.
    pub async fn mount(context: &WidgetContext, container: &str, props: &ListingLocation) -> Self {
        let widget = Self {
            id: Uuid::new_v4(),
            engine: Arc::clone(&context.engine),
            loader: Arc::clone(&context.loader),
            guard: SequenceGuard::new(),
            surface: Mutex::new(MapSurface::new(
                Arc::clone(&context.provider),
                context.default_center,
                context.zoom,
            )),
            view: Mutex::new(WidgetView::NoLocationData),
        };

        if let Err(failure) = widget.loader.ensure_loaded().await {
            warn!(id = %widget.id, container, "Map unavailable: {}", failure);
            widget.record(WidgetView::LocationUnavailable(failure));
            return widget;
        }

        let initial = LocationResolutionEngine::resolve_direct(&LocationQuery::from_listing(props));
        lock(&widget.surface).attach(container, initial.as_ref());
        info!(id = %widget.id, container, "Map widget mounted");

        widget.set_location(props).await;
        widget
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The last view that was actually applied
    pub fn view(&self) -> WidgetView {
        lock(&self.view).clone()
    }

    pub fn surface_state(&self) -> MapWidgetState {
        lock(&self.surface).state().clone()
    }

    /// Resolves new props and applies the result unless a newer update
    /// started meanwhile or the widget was unmounted.
    pub async fn set_location(&self, props: &ListingLocation) -> WidgetView {
        if self.guard.is_disposed() {
            return WidgetView::Disposed;
        }
        if let LoadState::Failed(failure) = self.loader.state() {
            return self.record(WidgetView::LocationUnavailable(failure));
        }

        let query = LocationQuery::from_listing(props);
        let resolution = self.engine.resolve_latest(&self.guard, &query).await;
        self.apply(resolution)
    }

    fn apply(&self, resolution: Resolution) -> WidgetView {
        let (resolved, token) = match resolution {
            Resolution::Current { resolved, token } => (resolved, token),
            Resolution::Stale => return self.stale_view(),
        };

        // Token checked again under the surface lock: a newer update may
        // have been applied since the engine released this one.
        let mut surface = lock(&self.surface);
        if !self.guard.is_current(token) {
            debug!(id = %self.id, ?token, "Newer update already applied, dropping this one");
            return self.stale_view();
        }
        surface.update(resolved.as_ref());
        let view = match resolved {
            Some(resolved) => WidgetView::Map(resolved),
            None => WidgetView::NoLocationData,
        };
        self.record(view)
    }

    fn stale_view(&self) -> WidgetView {
        if self.guard.is_disposed() {
            WidgetView::Disposed
        } else {
            WidgetView::Superseded
        }
    }

    /// Invalidates in-flight updates and releases the map and marker.
    pub fn unmount(&self) {
        self.guard.dispose();
        lock(&self.surface).dispose();
        *lock(&self.view) = WidgetView::Disposed;
        debug!(id = %self.id, "Map widget unmounted");
    }

    fn record(&self, view: WidgetView) -> WidgetView {
        *lock(&self.view) = view.clone();
        view
    }
}

impl Drop for MapWidget {
    fn drop(&mut self) {
        self.guard.dispose();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
