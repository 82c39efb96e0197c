//! Rectangles in page and bitmap space
//!
//! A tile is a slice of a page rendered at some resolution. The engine is
//! always asked to draw the *whole* page, sized and shifted so that the
//! wanted slice lands exactly on the output bitmap.

use pageview_cache::RelativeBounds;

/// Integer rectangle in bitmap pixels, edges inclusive-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Float rectangle with a top-left origin
///
/// Used both for page-space rectangles (document units, as returned by text
/// search) and for intermediate bitmap-space geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PageRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Overlapping area, or `None` when the rectangles do not overlap
    pub fn intersect(&self, other: &PageRect) -> Option<PageRect> {
        let rect = PageRect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> PageRect {
        PageRect::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    pub fn scale(&self, sx: f32, sy: f32) -> PageRect {
        PageRect::new(self.left * sx, self.top * sy, self.right * sx, self.bottom * sy)
    }

    /// `bounds` of a `width` x `height` area
    pub fn from_relative(bounds: RelativeBounds, width: f32, height: f32) -> PageRect {
        PageRect::new(
            bounds.left * width,
            bounds.top * height,
            bounds.right * width,
            bounds.bottom * height,
        )
    }
}

/// Placement of the full page relative to a tile bitmap
pub struct RenderBounds;

impl RenderBounds {
    /// Where the whole page must be drawn so that `bounds` fills a
    /// `width` x `height` bitmap
    ///
    /// The bitmap rectangle is translated by the negative slice origin,
    /// scaled by the inverse slice size, and rounded edge by edge.
    pub fn for_slice(width: u32, height: u32, bounds: RelativeBounds) -> PixelRect {
        let (w, h) = (width as f32, height as f32);
        let sx = 1.0 / bounds.width();
        let sy = 1.0 / bounds.height();

        let mapped = PageRect::new(0.0, 0.0, w, h)
            .translate(-bounds.left * w, -bounds.top * h)
            .scale(sx, sy);

        PixelRect::new(
            mapped.left.round() as i32,
            mapped.top.round() as i32,
            mapped.right.round() as i32,
            mapped.bottom.round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_page_bounds_are_identity() {
        let rect = RenderBounds::for_slice(300, 400, RelativeBounds::FULL);
        assert_eq!(rect, PixelRect::new(0, 0, 300, 400));
    }

    #[test]
    fn test_slice_bounds_shift_and_grow() {
        // Bottom-right quarter of a 512x512 page rendered into 256x256
        let bounds = RelativeBounds::new(0.5, 0.5, 1.0, 1.0);
        let rect = RenderBounds::for_slice(256, 256, bounds);
        assert_eq!(rect, PixelRect::new(-256, -256, 256, 256));
        assert_eq!(rect.width(), 512);
    }

    #[test]
    fn test_slice_bounds_round() {
        let bounds = RelativeBounds::new(0.0, 0.25, 0.5, 0.75);
        let rect = RenderBounds::for_slice(101, 100, bounds);
        assert_eq!(rect.left, 0);
        assert_eq!(rect.top, -50);
        assert_eq!(rect.right, 202);
        assert_eq!(rect.bottom, 150);
    }

    #[test]
    fn test_intersect() {
        let a = PageRect::new(0.0, 0.0, 10.0, 10.0);
        let b = PageRect::new(5.0, 5.0, 20.0, 20.0);
        assert_eq!(a.intersect(&b), Some(PageRect::new(5.0, 5.0, 10.0, 10.0)));

        let c = PageRect::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(a.intersect(&c), None);
    }
}
