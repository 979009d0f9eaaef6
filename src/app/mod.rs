pub mod engine;
pub mod geocoding;
pub mod loader;
pub mod map_surface;
pub mod ports;
pub mod widget;
