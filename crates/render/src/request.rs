//! Raster requests

use crate::engine::{Color, ColorScheme};
use pageview_cache::{RelativeBounds, TileKey};

/// Visual settings captured when a request is scheduled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    /// Fill color when no color scheme is active
    pub background: Color,
    pub highlight: Color,
    pub color_scheme: Option<ColorScheme>,
}

impl Appearance {
    /// Color the output bitmap is prefilled with
    pub fn fill(&self) -> Color {
        self.color_scheme
            .map(|scheme| scheme.background)
            .unwrap_or(self.background)
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            highlight: Color::HIGHLIGHT,
            color_scheme: None,
        }
    }
}

/// One tile to rasterize, consumed once by the worker
#[derive(Debug, Clone, PartialEq)]
pub struct RasterRequest {
    /// User page index, reported back in tiles and failures
    pub page: usize,
    /// Document page handed to the engine
    pub document_page: usize,
    /// Output width in pixels before rounding
    pub width: f32,
    /// Output height in pixels before rounding
    pub height: f32,
    pub bounds: RelativeBounds,
    pub thumbnail: bool,
    pub cache_order: u64,
    pub best_quality: bool,
    pub annotation_rendering: bool,
    pub search_query: String,
    pub appearance: Appearance,
}

impl RasterRequest {
    /// Cache identity of the tile this request produces
    pub fn key(&self) -> TileKey {
        TileKey::new(self.page, self.bounds, self.thumbnail, &self.search_query)
    }

    /// Output bitmap size, rounded to whole pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        (round_extent(self.width), round_extent(self.height))
    }
}

fn round_extent(extent: f32) -> u32 {
    if extent.is_finite() && extent > 0.0 {
        extent.round() as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(width: f32, height: f32) -> RasterRequest {
        RasterRequest {
            page: 1,
            document_page: 4,
            width,
            height,
            bounds: RelativeBounds::FULL,
            thumbnail: false,
            cache_order: 9,
            best_quality: false,
            annotation_rendering: false,
            search_query: "needle".to_string(),
            appearance: Appearance::default(),
        }
    }

    #[test]
    fn test_pixel_size_rounds() {
        assert_eq!(request(255.5, 100.4).pixel_size(), (256, 100));
        assert_eq!(request(0.4, 100.0).pixel_size(), (0, 100));
        assert_eq!(request(-3.0, f32::NAN).pixel_size(), (0, 0));
    }

    #[test]
    fn test_key_uses_user_page() {
        let key = request(10.0, 10.0).key();
        assert_eq!(key, TileKey::new(1, RelativeBounds::FULL, false, "needle"));
    }

    #[test]
    fn test_fill_prefers_color_scheme() {
        let mut appearance = Appearance::default();
        assert_eq!(appearance.fill(), Color::WHITE);

        appearance.color_scheme = Some(ColorScheme::night());
        assert_eq!(appearance.fill(), ColorScheme::night().background);
    }
}
