//! Document-wide page layout along the scroll axis
//!
//! Offsets, spacing and document length are stored at zoom 1 and scaled on
//! lookup. Everything is re-derived by [`DocumentLayout::recompute`]; under
//! [`FitPolicy::Both`] every page depends on the global widest/tallest page,
//! so there is no incremental update.
//!
//! Offsets never decrease. A degenerate page takes no room, so without any
//! spacing it starts where the next page starts; offset lookups then resolve
//! to the later, visible page.

use crate::fit::{FitPolicy, PageLayoutCalculator};
use crate::size::{PageSize, ScaledSize, ScrollAxis};
use serde::{Deserialize, Serialize};

/// Load-time layout settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub fit_policy: FitPolicy,
    pub axis: ScrollAxis,
    /// Fixed spacing between pages in pixels
    pub spacing: f32,
    /// Pad each page to the viewport extent so it appears centered
    pub auto_spacing: bool,
    /// Fit every page to the viewport instead of sharing one scale
    pub fit_each_page: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            fit_policy: FitPolicy::Width,
            axis: ScrollAxis::Vertical,
            spacing: 0.0,
            auto_spacing: false,
            fit_each_page: false,
        }
    }
}

impl LayoutOptions {
    pub fn with_fit_policy(mut self, fit_policy: FitPolicy) -> Self {
        self.fit_policy = fit_policy;
        self
    }

    pub fn with_axis(mut self, axis: ScrollAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing.max(0.0);
        self
    }

    pub fn with_auto_spacing(mut self, auto_spacing: bool) -> Self {
        self.auto_spacing = auto_spacing;
        self
    }

    pub fn with_fit_each_page(mut self, fit_each_page: bool) -> Self {
        self.fit_each_page = fit_each_page;
        self
    }
}

/// Scaled sizes and positions of every page in a document
///
/// Page indices are user pages: when a page order is supplied, user page `i`
/// shows document page `user_pages[i]`.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    options: LayoutOptions,
    user_pages: Option<Vec<usize>>,
    original_sizes: Vec<PageSize>,
    original_max_width_page: PageSize,
    original_max_height_page: PageSize,
    viewport: ScaledSize,
    sizes: Vec<ScaledSize>,
    spacing: Vec<f32>,
    offsets: Vec<f32>,
    max_page_width: f32,
    max_page_height: f32,
    document_length: f32,
}

impl DocumentLayout {
    /// Create a layout
    ///
    /// # Arguments
    ///
    /// * `page_sizes` - Intrinsic size of each user page, in display order
    /// * `options` - Layout settings
    /// * `user_pages` - Optional mapping from user page to document page
    ///
    /// The layout is empty until [`recompute`](Self::recompute) is called with
    /// a viewport size.
    pub fn new(
        page_sizes: Vec<PageSize>,
        options: LayoutOptions,
        user_pages: Option<Vec<usize>>,
    ) -> Self {
        let mut original_max_width_page = PageSize::default();
        let mut original_max_height_page = PageSize::default();
        for size in &page_sizes {
            if size.width > original_max_width_page.width {
                original_max_width_page = *size;
            }
            if size.height > original_max_height_page.height {
                original_max_height_page = *size;
            }
        }

        Self {
            options,
            user_pages,
            original_sizes: page_sizes,
            original_max_width_page,
            original_max_height_page,
            viewport: ScaledSize::ZERO,
            sizes: Vec::new(),
            spacing: Vec::new(),
            offsets: Vec::new(),
            max_page_width: 0.0,
            max_page_height: 0.0,
            document_length: 0.0,
        }
    }

    /// Re-derive all page sizes, spacing, offsets and document length
    pub fn recompute(&mut self, viewport: ScaledSize) {
        self.viewport = viewport;
        let calculator = PageLayoutCalculator::new(
            self.options.fit_policy,
            self.original_max_width_page,
            self.original_max_height_page,
            viewport,
            self.options.fit_each_page,
        );

        self.sizes = self
            .original_sizes
            .iter()
            .map(|size| calculator.calculate(*size))
            .collect();
        self.max_page_width = self.sizes.iter().map(|s| s.width).fold(0.0, f32::max);
        self.max_page_height = self.sizes.iter().map(|s| s.height).fold(0.0, f32::max);

        self.spacing.clear();
        if self.options.auto_spacing {
            self.prepare_auto_spacing();
        }
        self.prepare_offsets();
    }

    fn prepare_auto_spacing(&mut self) {
        let axis = self.options.axis;
        let viewport_extent = self.viewport.primary(axis);
        let count = self.sizes.len();

        self.spacing = self
            .sizes
            .iter()
            .enumerate()
            .map(|(i, size)| {
                let mut spacing = (viewport_extent - size.primary(axis)).max(0.0);
                if i + 1 < count {
                    spacing += self.options.spacing;
                }
                spacing
            })
            .collect();
    }

    fn prepare_offsets(&mut self) {
        let axis = self.options.axis;
        let fixed = self.options.spacing;
        let count = self.sizes.len();

        self.offsets.clear();
        let mut offset = 0.0f32;
        for (i, size) in self.sizes.iter().enumerate() {
            let extent = size.primary(axis);
            if self.options.auto_spacing {
                let half = self.spacing[i] / 2.0;
                offset += half;
                if count > 1 {
                    if i == 0 {
                        offset -= fixed / 2.0;
                    } else if i + 1 == count {
                        offset += fixed / 2.0;
                    }
                }
                self.offsets.push(offset);
                offset += extent + half;
            } else {
                self.offsets.push(offset);
                offset += extent;
                if i + 1 < count {
                    offset += fixed;
                }
            }
        }
        self.document_length = offset;
    }

    /// Number of user pages
    pub fn pages_count(&self) -> usize {
        self.original_sizes.len()
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn axis(&self) -> ScrollAxis {
        self.options.axis
    }

    /// Viewport used by the last recompute
    pub fn viewport(&self) -> ScaledSize {
        self.viewport
    }

    /// Intrinsic size of a user page
    pub fn original_page_size(&self, page: usize) -> Option<PageSize> {
        self.original_sizes.get(page).copied()
    }

    /// Scaled size of a user page at zoom 1
    pub fn page_size(&self, page: usize) -> Option<ScaledSize> {
        self.sizes.get(page).copied()
    }

    /// Scaled size at `zoom`, or [`ScaledSize::ZERO`] for an unknown page
    pub fn scaled_page_size(&self, page: usize, zoom: f32) -> ScaledSize {
        self.page_size(page)
            .map(|size| size.zoomed(zoom))
            .unwrap_or(ScaledSize::ZERO)
    }

    /// Width of the widest scaled page at zoom 1
    pub fn max_page_width(&self) -> f32 {
        self.max_page_width
    }

    /// Height of the tallest scaled page at zoom 1
    pub fn max_page_height(&self) -> f32 {
        self.max_page_height
    }

    /// Total scrollable length along the scroll axis
    pub fn document_length(&self, zoom: f32) -> f32 {
        self.document_length * zoom
    }

    /// Start of a page along the scroll axis, 0 for an unknown page
    pub fn page_offset(&self, page: usize, zoom: f32) -> f32 {
        self.offsets.get(page).map(|o| o * zoom).unwrap_or(0.0)
    }

    /// Extent of a page along the scroll axis, 0 for an unknown page
    pub fn page_length(&self, page: usize, zoom: f32) -> f32 {
        self.page_size(page)
            .map(|size| size.primary(self.options.axis) * zoom)
            .unwrap_or(0.0)
    }

    /// Spacing attributed to a page
    pub fn page_spacing(&self, page: usize, zoom: f32) -> f32 {
        let spacing = if self.options.auto_spacing {
            self.spacing.get(page).copied().unwrap_or(0.0)
        } else {
            self.options.spacing
        };
        spacing * zoom
    }

    /// Spacing after the last page
    pub fn trailing_spacing(&self, zoom: f32) -> f32 {
        if self.options.auto_spacing {
            self.spacing.last().map(|s| s / 2.0 * zoom).unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Cross-axis offset that centers a page narrower than the widest one
    pub fn secondary_offset(&self, page: usize, zoom: f32) -> f32 {
        let Some(size) = self.page_size(page) else {
            return 0.0;
        };
        let (max_extent, extent) = match self.options.axis {
            ScrollAxis::Vertical => (self.max_page_width, size.width),
            ScrollAxis::Horizontal => (self.max_page_height, size.height),
        };
        zoom * (max_extent - extent) / 2.0
    }

    /// Last page whose start (minus half its spacing) is at or before `offset`
    pub fn page_at_offset(&self, offset: f32, zoom: f32) -> usize {
        let mut current = 0usize;
        for (i, page_offset) in self.offsets.iter().enumerate() {
            let start = page_offset * zoom - self.page_spacing(i, zoom) / 2.0;
            if start > offset {
                break;
            }
            current += 1;
        }
        current.saturating_sub(1)
    }

    /// Document page shown at a user page, `None` when out of range
    pub fn document_page(&self, user_page: usize) -> Option<usize> {
        if user_page >= self.pages_count() {
            return None;
        }
        match &self.user_pages {
            Some(pages) => pages.get(user_page).copied(),
            None => Some(user_page),
        }
    }

    /// Clamp a requested user page into the valid range
    pub fn valid_page_from(&self, user_page: usize) -> usize {
        user_page.min(self.pages_count().saturating_sub(1))
    }

    pub fn user_pages(&self) -> Option<&[usize]> {
        self.user_pages.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn letter_pages(count: usize) -> Vec<PageSize> {
        vec![PageSize::new(612.0, 792.0); count]
    }

    #[test]
    fn test_single_page_fit_width() {
        let mut layout = DocumentLayout::new(
            vec![PageSize::new(2000.0, 3200.0)],
            LayoutOptions::default(),
            None,
        );
        layout.recompute(ScaledSize::new(1000.0, 1600.0));

        assert_eq!(layout.page_size(0), Some(ScaledSize::new(1000.0, 1600.0)));
        assert_eq!(layout.document_length(1.0), 1600.0);
        assert_eq!(layout.page_offset(0, 1.0), 0.0);
    }

    #[test]
    fn test_fixed_spacing_offsets() {
        let mut layout = DocumentLayout::new(
            vec![PageSize::new(100.0, 200.0); 3],
            LayoutOptions::default().with_spacing(10.0),
            None,
        );
        layout.recompute(ScaledSize::new(100.0, 150.0));

        assert_eq!(layout.page_offset(0, 1.0), 0.0);
        assert_eq!(layout.page_offset(1, 1.0), 210.0);
        assert_eq!(layout.page_offset(2, 1.0), 420.0);
        assert_eq!(layout.document_length(1.0), 620.0);
        assert_eq!(layout.page_offset(2, 2.0), 840.0);
    }

    #[test]
    fn test_auto_spacing_centers_short_pages() {
        // Landscape pages in a portrait viewport
        let mut layout = DocumentLayout::new(
            vec![PageSize::new(200.0, 100.0); 2],
            LayoutOptions::default()
                .with_auto_spacing(true)
                .with_spacing(20.0),
            None,
        );
        layout.recompute(ScaledSize::new(200.0, 300.0));

        // spacing = [200 + 20, 200]
        assert_eq!(layout.page_spacing(0, 1.0), 220.0);
        assert_eq!(layout.page_spacing(1, 1.0), 200.0);
        assert_eq!(layout.page_offset(0, 1.0), 100.0);
        assert_eq!(layout.page_offset(1, 1.0), 420.0);
        assert_eq!(layout.document_length(1.0), 620.0);
        assert_eq!(
            layout.document_length(1.0),
            layout.page_offset(1, 1.0) + layout.page_length(1, 1.0) + layout.trailing_spacing(1.0)
        );
    }

    #[test]
    fn test_offsets_increasing_and_length() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let count = rng.gen_range(1..40);
            let pages: Vec<PageSize> = (0..count)
                .map(|_| {
                    if rng.gen_bool(0.1) {
                        PageSize::new(0.0, 0.0)
                    } else {
                        PageSize::new(rng.gen_range(200.0..2000.0), rng.gen_range(200.0..2000.0))
                    }
                })
                .collect();
            let options = LayoutOptions {
                fit_policy: match rng.gen_range(0..3) {
                    0 => FitPolicy::Width,
                    1 => FitPolicy::Height,
                    _ => FitPolicy::Both,
                },
                axis: if rng.gen_bool(0.5) {
                    ScrollAxis::Vertical
                } else {
                    ScrollAxis::Horizontal
                },
                spacing: if rng.gen_bool(0.3) {
                    0.0
                } else {
                    rng.gen_range(0.0..50.0)
                },
                auto_spacing: rng.gen_bool(0.5),
                fit_each_page: rng.gen_bool(0.5),
            };
            let mut layout = DocumentLayout::new(pages, options, None);
            layout.recompute(ScaledSize::new(
                rng.gen_range(200..3000) as f32,
                rng.gen_range(200..3000) as f32,
            ));

            for i in 1..count {
                let previous = layout.page_offset(i - 1, 1.0);
                let previous_length = layout.page_length(i - 1, 1.0);
                let offset = layout.page_offset(i, 1.0);
                assert!(
                    offset >= previous + previous_length - 1e-3,
                    "page {} overlaps its predecessor under {:?}",
                    i,
                    options
                );
                if previous_length > 0.0 {
                    assert!(
                        offset > previous,
                        "offset {} not increasing under {:?}",
                        i,
                        options
                    );
                }
            }

            let last = count - 1;
            let expected = layout.page_offset(last, 1.0)
                + layout.page_length(last, 1.0)
                + layout.trailing_spacing(1.0);
            let length = layout.document_length(1.0);
            assert!(
                (length - expected).abs() <= length.abs() * 1e-5 + 1e-3,
                "length {} != {} under {:?}",
                length,
                expected,
                options
            );
        }
    }

    #[test]
    fn test_page_at_offset() {
        let mut layout = DocumentLayout::new(
            vec![PageSize::new(100.0, 200.0); 4],
            LayoutOptions::default().with_spacing(10.0),
            None,
        );
        layout.recompute(ScaledSize::new(100.0, 150.0));

        assert_eq!(layout.page_at_offset(-50.0, 1.0), 0);
        assert_eq!(layout.page_at_offset(0.0, 1.0), 0);
        assert_eq!(layout.page_at_offset(199.0, 1.0), 0);
        assert_eq!(layout.page_at_offset(206.0, 1.0), 1);
        assert_eq!(layout.page_at_offset(500.0, 1.0), 2);
        assert_eq!(layout.page_at_offset(10_000.0, 1.0), 3);
        // Zoomed: page 1 starts at 420
        assert_eq!(layout.page_at_offset(400.0, 2.0), 0);
        assert_eq!(layout.page_at_offset(420.0, 2.0), 1);
    }

    #[test]
    fn test_secondary_offset_centers_narrow_page() {
        let mut layout = DocumentLayout::new(
            vec![PageSize::new(200.0, 100.0), PageSize::new(100.0, 100.0)],
            LayoutOptions::default(),
            None,
        );
        layout.recompute(ScaledSize::new(400.0, 400.0));

        assert_eq!(layout.page_size(1), Some(ScaledSize::new(200.0, 200.0)));
        assert_eq!(layout.secondary_offset(0, 1.0), 0.0);
        assert_eq!(layout.secondary_offset(1, 1.0), 100.0);
        assert_eq!(layout.secondary_offset(1, 2.0), 200.0);
    }

    #[test]
    fn test_degenerate_page_is_zero_sized() {
        let mut layout = DocumentLayout::new(
            vec![PageSize::new(612.0, 792.0), PageSize::new(0.0, 0.0)],
            LayoutOptions::default(),
            None,
        );
        layout.recompute(ScaledSize::new(612.0, 800.0));

        assert_eq!(layout.page_size(1), Some(ScaledSize::ZERO));
        assert_eq!(layout.page_length(1, 1.0), 0.0);
    }

    #[test]
    fn test_degenerate_page_shares_offset_without_spacing() {
        let mut layout = DocumentLayout::new(
            vec![
                PageSize::new(612.0, 792.0),
                PageSize::new(0.0, 0.0),
                PageSize::new(612.0, 792.0),
            ],
            LayoutOptions::default(),
            None,
        );
        layout.recompute(ScaledSize::new(612.0, 800.0));

        assert_eq!(layout.page_offset(1, 1.0), 792.0);
        assert_eq!(layout.page_offset(2, 1.0), 792.0);
        assert_eq!(layout.page_at_offset(792.0, 1.0), 2);
        assert_eq!(layout.page_at_offset(791.0, 1.0), 0);

        // Any spacing separates them again
        let mut spaced = DocumentLayout::new(
            vec![
                PageSize::new(612.0, 792.0),
                PageSize::new(0.0, 0.0),
                PageSize::new(612.0, 792.0),
            ],
            LayoutOptions::default().with_spacing(10.0),
            None,
        );
        spaced.recompute(ScaledSize::new(612.0, 800.0));
        assert!(spaced.page_offset(2, 1.0) > spaced.page_offset(1, 1.0));
    }

    #[test]
    fn test_user_page_mapping() {
        let layout = DocumentLayout::new(
            letter_pages(3),
            LayoutOptions::default(),
            Some(vec![4, 0, 2]),
        );

        assert_eq!(layout.document_page(0), Some(4));
        assert_eq!(layout.document_page(2), Some(2));
        assert_eq!(layout.document_page(3), None);
        assert_eq!(layout.valid_page_from(10), 2);
    }

    #[test]
    fn test_unknown_page_sentinels() {
        let mut layout = DocumentLayout::new(letter_pages(2), LayoutOptions::default(), None);
        layout.recompute(ScaledSize::new(612.0, 800.0));

        assert_eq!(layout.page_size(5), None);
        assert_eq!(layout.scaled_page_size(5, 1.0), ScaledSize::ZERO);
        assert_eq!(layout.page_offset(5, 1.0), 0.0);
        assert_eq!(layout.document_page(5), None);
    }

    #[test]
    fn test_recompute_on_resize() {
        let mut layout = DocumentLayout::new(
            vec![PageSize::new(600.0, 800.0); 2],
            LayoutOptions::default(),
            None,
        );
        layout.recompute(ScaledSize::new(600.0, 800.0));
        let before = layout.document_length(1.0);

        layout.recompute(ScaledSize::new(1200.0, 800.0));
        assert_eq!(layout.page_size(0), Some(ScaledSize::new(1200.0, 1600.0)));
        assert_eq!(layout.document_length(1.0), before * 2.0);
    }
}
