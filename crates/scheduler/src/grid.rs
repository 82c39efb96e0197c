//! Per-page tile grid
//!
//! The grid is sized so that every tile covers roughly one fixed device-pixel
//! footprint at the current zoom: zooming in adds tiles instead of growing
//! them.

use pageview_cache::RelativeBounds;
use pageview_layout::ScaledSize;
use pageview_render::PageRect;
use std::ops::RangeInclusive;

/// Grid over one page at one zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub rows: usize,
    pub cols: usize,
    /// Cell width relative to the page
    pub cell_width: f32,
    /// Cell height relative to the page
    pub cell_height: f32,
    /// Whole-page width at tile resolution
    pub render_width: f32,
    /// Whole-page height at tile resolution
    pub render_height: f32,
}

/// One grid cell clipped to the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCell {
    pub row: usize,
    pub col: usize,
    pub bounds: RelativeBounds,
    /// Output width in pixels
    pub width: f32,
    /// Output height in pixels
    pub height: f32,
}

impl TileGrid {
    /// Grid for a page of `size` (already zoomed), `None` for a degenerate page
    pub fn for_page(size: ScaledSize, tile_size: f32) -> Option<Self> {
        if size.is_degenerate() || !(tile_size > 0.0) {
            return None;
        }
        let cols = (size.width / tile_size).ceil().max(1.0) as usize;
        let rows = (size.height / tile_size).ceil().max(1.0) as usize;
        let cell_width = 1.0 / cols as f32;
        let cell_height = 1.0 / rows as f32;

        Some(Self {
            rows,
            cols,
            cell_width,
            cell_height,
            render_width: tile_size / cell_width,
            render_height: tile_size / cell_height,
        })
    }

    /// Cell at `row`, `col`, clipped at the page edge
    ///
    /// Returns `None` when nothing of the cell remains on the page.
    pub fn cell(&self, row: usize, col: usize) -> Option<TileCell> {
        let left = self.cell_width * col as f32;
        let top = self.cell_height * row as f32;
        let width = self.cell_width.min(1.0 - left);
        let height = self.cell_height.min(1.0 - top);

        let render_width = self.render_width * width;
        let render_height = self.render_height * height;
        if !(render_width > 0.0 && render_height > 0.0) {
            return None;
        }

        Some(TileCell {
            row,
            col,
            bounds: RelativeBounds::from_origin(left, top, width, height),
            width: render_width,
            height: render_height,
        })
    }

    /// Rows and columns touched by `area`, given in page-relative units
    ///
    /// Returns `None` when `area` misses the page.
    pub fn cells_covering(
        &self,
        area: PageRect,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        let page = PageRect::new(0.0, 0.0, 1.0, 1.0);
        let area = area.intersect(&page)?;
        let rows = span(area.top, area.bottom, self.rows);
        let cols = span(area.left, area.right, self.cols);
        Some((rows, cols))
    }
}

fn span(start: f32, end: f32, count: usize) -> RangeInclusive<usize> {
    let last_index = count.saturating_sub(1);
    let first = ((start * count as f32).floor().max(0.0) as usize).min(last_index);
    let last = ((end * count as f32).ceil() as usize)
        .saturating_sub(1)
        .clamp(first, last_index);
    first..=last
}
