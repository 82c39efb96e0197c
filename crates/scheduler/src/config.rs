//! Scheduling parameters

use serde::{Deserialize, Serialize};

/// Target tile footprint in device pixels
pub const DEFAULT_TILE_SIZE: f32 = 256.0;

/// Thumbnail size relative to the page at zoom 1
pub const DEFAULT_THUMBNAIL_RATIO: f32 = 0.3;

/// Extra pixels scheduled before and after the viewport on the scroll axis
pub const DEFAULT_PRELOAD_OFFSET: f32 = 20.0;

/// Configuration for the visible range scheduler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tile_size: f32,
    pub thumbnail_ratio: f32,
    pub preload_offset: f32,
    /// Tiles looked up or requested per pass, at most
    pub max_tiles_per_pass: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            thumbnail_ratio: DEFAULT_THUMBNAIL_RATIO,
            preload_offset: DEFAULT_PRELOAD_OFFSET,
            max_tiles_per_pass: pageview_cache::DEFAULT_CAPACITY,
        }
    }
}

impl SchedulerConfig {
    pub fn with_tile_size(mut self, tile_size: f32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_preload_offset(mut self, preload_offset: f32) -> Self {
        self.preload_offset = preload_offset;
        self
    }

    pub fn with_max_tiles_per_pass(mut self, max_tiles_per_pass: usize) -> Self {
        self.max_tiles_per_pass = max_tiles_per_pass;
        self
    }

    /// Check every value, returning the name of the first bad one
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.tile_size.is_finite() && self.tile_size >= 1.0) {
            return Err("tile_size");
        }
        if !(self.thumbnail_ratio > 0.0 && self.thumbnail_ratio <= 1.0) {
            return Err("thumbnail_ratio");
        }
        if !(self.preload_offset.is_finite() && self.preload_offset >= 0.0) {
            return Err("preload_offset");
        }
        if self.max_tiles_per_pass == 0 {
            return Err("max_tiles_per_pass");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tile_size, 256.0);
        assert_eq!(config.thumbnail_ratio, 0.3);
        assert_eq!(config.preload_offset, 20.0);
        assert_eq!(config.max_tiles_per_pass, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_key() {
        assert_eq!(
            SchedulerConfig::default().with_tile_size(0.0).validate(),
            Err("tile_size")
        );
        assert_eq!(
            SchedulerConfig::default().with_preload_offset(-1.0).validate(),
            Err("preload_offset")
        );
        assert_eq!(
            SchedulerConfig::default().with_max_tiles_per_pass(0).validate(),
            Err("max_tiles_per_pass")
        );
    }
}
