//! Tile cache for paginated document viewers
//!
//! Holds rendered page tiles in two generations (active and passive) plus a
//! separate pool of whole-page thumbnails. See [`TileCache`].

pub mod config;
pub mod tile;
pub mod tile_cache;

pub use config::{CacheConfig, ConfigError, DEFAULT_CAPACITY, DEFAULT_THUMBNAIL_CAPACITY};
pub use tile::{RelativeBounds, Tile, TileKey};
pub use tile_cache::{CacheStats, TileCache};
