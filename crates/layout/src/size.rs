//! Size types for the two coordinate spaces a page lives in
//!
//! [`PageSize`] is what the document reports (points). [`ScaledSize`] is what
//! the view draws at zoom 1. The calculator is the only bridge between them.

use serde::{Deserialize, Serialize};

/// Intrinsic page size in document units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A page that cannot be laid out (non-positive dimension)
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Width over height
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// On-screen page size at zoom 1
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaledSize {
    pub width: f32,
    pub height: f32,
}

impl ScaledSize {
    /// Sentinel for pages that could not be scaled
    pub const ZERO: ScaledSize = ScaledSize {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Size multiplied by a zoom factor
    pub fn zoomed(&self, zoom: f32) -> ScaledSize {
        ScaledSize::new(self.width * zoom, self.height * zoom)
    }

    /// Extent along the scroll axis
    pub fn primary(&self, axis: ScrollAxis) -> f32 {
        match axis {
            ScrollAxis::Vertical => self.height,
            ScrollAxis::Horizontal => self.width,
        }
    }

    /// Extent across the scroll axis
    pub fn secondary(&self, axis: ScrollAxis) -> f32 {
        match axis {
            ScrollAxis::Vertical => self.width,
            ScrollAxis::Horizontal => self.height,
        }
    }
}

/// Direction pages are stacked and scrolled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAxis {
    #[default]
    Vertical,
    Horizontal,
}

impl ScrollAxis {
    pub fn is_vertical(self) -> bool {
        matches!(self, ScrollAxis::Vertical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_pages() {
        assert!(PageSize::new(0.0, 100.0).is_degenerate());
        assert!(PageSize::new(100.0, -1.0).is_degenerate());
        assert!(PageSize::new(f32::NAN, 10.0).is_degenerate());
        assert!(!PageSize::new(612.0, 792.0).is_degenerate());
        assert!(ScaledSize::ZERO.is_degenerate());
    }

    #[test]
    fn test_axis_extents() {
        let size = ScaledSize::new(300.0, 500.0);
        assert_eq!(size.primary(ScrollAxis::Vertical), 500.0);
        assert_eq!(size.secondary(ScrollAxis::Vertical), 300.0);
        assert_eq!(size.primary(ScrollAxis::Horizontal), 300.0);
        assert_eq!(size.secondary(ScrollAxis::Horizontal), 500.0);
    }

    #[test]
    fn test_zoomed() {
        assert_eq!(
            ScaledSize::new(100.0, 50.0).zoomed(2.5),
            ScaledSize::new(250.0, 125.0)
        );
    }
}
