pub mod app;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;

pub use app::engine::{LocationResolutionEngine, Resolution, SequenceGuard};
pub use app::geocoding::GeocodingResolver;
pub use app::loader::{LoadState, ResourceLoader};
pub use app::map_surface::{MapSurface, MapWidgetState, ZoomLevels};
pub use app::widget::{MapWidget, WidgetContext, WidgetView};
pub use domain::{Coordinate, ListingLocation, LocationQuery, Precision, ResolvedLocation};
pub use error::{GeocodeFailure, LoadFailure, LocatorError};
