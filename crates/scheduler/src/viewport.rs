//! Viewport state in document coordinates

use pageview_layout::{ScaledSize, ScrollAxis};
use pageview_render::PageRect;

/// Position and size of the viewport over the zoomed document
///
/// Scroll offsets are distances from the document origin in zoomed pixels.
/// They are negative when content smaller than the viewport is centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub width: f32,
    pub height: f32,
    pub zoom: f32,
}

impl ViewportState {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            scroll_x: 0.0,
            scroll_y: 0.0,
            width,
            height,
            zoom: 1.0,
        }
    }

    pub fn with_scroll(mut self, scroll_x: f32, scroll_y: f32) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn size(&self) -> ScaledSize {
        ScaledSize::new(self.width, self.height)
    }

    /// Nothing can be shown
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.zoom > 0.0)
    }

    /// Scroll offset along `axis`
    pub fn primary_scroll(&self, axis: ScrollAxis) -> f32 {
        match axis {
            ScrollAxis::Vertical => self.scroll_y,
            ScrollAxis::Horizontal => self.scroll_x,
        }
    }

    /// Viewport extent along `axis`
    pub fn primary_extent(&self, axis: ScrollAxis) -> f32 {
        self.size().primary(axis)
    }

    /// Visible area in zoomed document pixels
    pub fn visible_rect(&self) -> PageRect {
        PageRect::new(
            self.scroll_x,
            self.scroll_y,
            self.scroll_x + self.width,
            self.scroll_y + self.height,
        )
    }

    /// Visible area grown by `margin` at both ends of the scroll axis
    pub fn preload_rect(&self, axis: ScrollAxis, margin: f32) -> PageRect {
        let rect = self.visible_rect();
        match axis {
            ScrollAxis::Vertical => {
                PageRect::new(rect.left, rect.top - margin, rect.right, rect.bottom + margin)
            }
            ScrollAxis::Horizontal => {
                PageRect::new(rect.left - margin, rect.top, rect.right + margin, rect.bottom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_rect_grows_scroll_axis_only() {
        let viewport = ViewportState::new(800.0, 600.0).with_scroll(10.0, 100.0);

        let vertical = viewport.preload_rect(ScrollAxis::Vertical, 20.0);
        assert_eq!(vertical, PageRect::new(10.0, 80.0, 810.0, 720.0));

        let horizontal = viewport.preload_rect(ScrollAxis::Horizontal, 20.0);
        assert_eq!(horizontal, PageRect::new(-10.0, 100.0, 830.0, 700.0));
    }

    #[test]
    fn test_primary_accessors() {
        let viewport = ViewportState::new(800.0, 600.0).with_scroll(5.0, 7.0);
        assert_eq!(viewport.primary_scroll(ScrollAxis::Vertical), 7.0);
        assert_eq!(viewport.primary_scroll(ScrollAxis::Horizontal), 5.0);
        assert_eq!(viewport.primary_extent(ScrollAxis::Vertical), 600.0);
        assert_eq!(viewport.primary_extent(ScrollAxis::Horizontal), 800.0);
    }

    #[test]
    fn test_degenerate() {
        assert!(ViewportState::new(0.0, 600.0).is_degenerate());
        assert!(ViewportState::new(800.0, 600.0).with_zoom(0.0).is_degenerate());
        assert!(!ViewportState::new(800.0, 600.0).is_degenerate());
    }
}
