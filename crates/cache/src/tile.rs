//! Tile identity and rendered tile data

use image::RgbaImage;
use std::hash::{Hash, Hasher};

/// Sub-rectangle of a page in page-relative units (`[0, 1]` on both axes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RelativeBounds {
    /// The whole page
    pub const FULL: RelativeBounds = RelativeBounds {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Bounds from an origin and a size
    pub fn from_origin(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }
}

// Identity is exact value equality, so hashing by bit pattern is consistent
// with `PartialEq` for every value the scheduler produces (no NaN, no -0.0).
impl Eq for RelativeBounds {}

impl Hash for RelativeBounds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.left.to_bits().hash(state);
        self.top.to_bits().hash(state);
        self.right.to_bits().hash(state);
        self.bottom.to_bits().hash(state);
    }
}

/// Cache identity of a tile
///
/// Two tiles are the same cache entry when page, bounds, thumbnail flag and
/// the search query they were rendered with all match. Pixel content plays
/// no part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// User page index
    pub page: usize,
    pub bounds: RelativeBounds,
    pub thumbnail: bool,
    /// Search query highlighted into the pixels
    pub search_query: String,
}

impl TileKey {
    pub fn new(page: usize, bounds: RelativeBounds, thumbnail: bool, search_query: &str) -> Self {
        Self {
            page,
            bounds,
            thumbnail,
            search_query: search_query.to_string(),
        }
    }

    /// Whole-page thumbnail key
    pub fn thumbnail(page: usize, search_query: &str) -> Self {
        Self::new(page, RelativeBounds::FULL, true, search_query)
    }
}

/// A rasterized region of one page
///
/// Immutable once created. The pixel buffer is released when the last
/// handle to the tile is dropped.
#[derive(Debug, Clone)]
pub struct Tile {
    pub key: TileKey,

    /// Recency counter assigned when the tile was requested
    pub cache_order: u64,

    /// RGBA pixels
    pub bitmap: RgbaImage,
}

impl Tile {
    pub fn new(key: TileKey, cache_order: u64, bitmap: RgbaImage) -> Self {
        Self {
            key,
            cache_order,
            bitmap,
        }
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn page(&self) -> usize {
        self.key.page
    }

    pub fn is_thumbnail(&self) -> bool {
        self.key.thumbnail
    }

    /// Size of the pixel buffer in bytes
    pub fn byte_size(&self) -> usize {
        self.bitmap.as_raw().len()
    }
}
