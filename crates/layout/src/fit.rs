//! Fit policies and the page size calculator
//!
//! All derived extents are floored so that neighbouring pages never overlap
//! by a fractional pixel.

use crate::size::{PageSize, ScaledSize};
use serde::{Deserialize, Serialize};

/// How a page is scaled into the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Page width matches the viewport width
    #[default]
    Width,
    /// Page height matches the viewport height
    Height,
    /// Page is fully contained in the viewport
    Both,
}

impl std::str::FromStr for FitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "width" => Ok(FitPolicy::Width),
            "height" => Ok(FitPolicy::Height),
            "both" => Ok(FitPolicy::Both),
            other => Err(format!("unknown fit policy: {}", other)),
        }
    }
}

/// Scale `page` so its width equals `max_width`
///
/// Returns [`ScaledSize::ZERO`] for degenerate pages.
pub fn fit_width(page: PageSize, max_width: f32) -> ScaledSize {
    if page.is_degenerate() {
        return ScaledSize::ZERO;
    }
    let ratio = page.aspect();
    ScaledSize::new(max_width, (max_width / ratio).floor())
}

/// Scale `page` so its height equals `max_height`
pub fn fit_height(page: PageSize, max_height: f32) -> ScaledSize {
    if page.is_degenerate() {
        return ScaledSize::ZERO;
    }
    let ratio = page.height / page.width;
    ScaledSize::new((max_height / ratio).floor(), max_height)
}

/// Scale `page` to fit inside `max_width` x `max_height`
///
/// Fits the width first and falls back to fitting the height when the
/// result would overflow vertically.
pub fn fit_both(page: PageSize, max_width: f32, max_height: f32) -> ScaledSize {
    if page.is_degenerate() {
        return ScaledSize::ZERO;
    }
    let ratio = page.aspect();
    let height = (max_width / ratio).floor();
    if height > max_height {
        ScaledSize::new((max_height * ratio).floor(), max_height)
    } else {
        ScaledSize::new(max_width, height)
    }
}

fn ratio_of(scaled: f32, original: f32) -> f32 {
    if original > 0.0 {
        scaled / original
    } else {
        0.0
    }
}

/// Derives on-screen page sizes for one viewport
///
/// Unless every page is fitted independently, a single scale is derived from
/// the widest and tallest pages and applied to all of them, so the document
/// reads as one continuous strip.
#[derive(Debug, Clone)]
pub struct PageLayoutCalculator {
    policy: FitPolicy,
    viewport: ScaledSize,
    fit_each_page: bool,
    optimal_max_width_page: ScaledSize,
    optimal_max_height_page: ScaledSize,
    width_ratio: f32,
    height_ratio: f32,
}

impl PageLayoutCalculator {
    /// Create a calculator
    ///
    /// # Arguments
    ///
    /// * `policy` - Fit policy
    /// * `max_width_page` - Intrinsic size of the widest page
    /// * `max_height_page` - Intrinsic size of the tallest page
    /// * `viewport` - Viewport size in pixels
    /// * `fit_each_page` - Fit every page to the viewport on its own
    pub fn new(
        policy: FitPolicy,
        max_width_page: PageSize,
        max_height_page: PageSize,
        viewport: ScaledSize,
        fit_each_page: bool,
    ) -> Self {
        let mut calculator = Self {
            policy,
            viewport,
            fit_each_page,
            optimal_max_width_page: ScaledSize::ZERO,
            optimal_max_height_page: ScaledSize::ZERO,
            width_ratio: 0.0,
            height_ratio: 0.0,
        };
        calculator.derive_max_pages(max_width_page, max_height_page);
        calculator
    }

    fn derive_max_pages(&mut self, max_width_page: PageSize, max_height_page: PageSize) {
        let viewport = self.viewport;
        match self.policy {
            FitPolicy::Height => {
                self.optimal_max_height_page = fit_height(max_height_page, viewport.height);
                self.height_ratio =
                    ratio_of(self.optimal_max_height_page.height, max_height_page.height);
                self.optimal_max_width_page =
                    fit_height(max_width_page, max_width_page.height * self.height_ratio);
            }
            FitPolicy::Both => {
                let local_max_width = fit_both(max_width_page, viewport.width, viewport.height);
                let local_width_ratio = ratio_of(local_max_width.width, max_width_page.width);
                self.optimal_max_height_page = fit_both(
                    max_height_page,
                    max_height_page.width * local_width_ratio,
                    viewport.height,
                );
                self.height_ratio =
                    ratio_of(self.optimal_max_height_page.height, max_height_page.height);
                self.optimal_max_width_page = fit_both(
                    max_width_page,
                    viewport.width,
                    max_width_page.height * self.height_ratio,
                );
                self.width_ratio =
                    ratio_of(self.optimal_max_width_page.width, max_width_page.width);
            }
            FitPolicy::Width => {
                self.optimal_max_width_page = fit_width(max_width_page, viewport.width);
                self.width_ratio =
                    ratio_of(self.optimal_max_width_page.width, max_width_page.width);
                self.optimal_max_height_page =
                    fit_width(max_height_page, max_height_page.width * self.width_ratio);
            }
        }
    }

    /// Scaled size of one page
    pub fn calculate(&self, page: PageSize) -> ScaledSize {
        if page.is_degenerate() {
            return ScaledSize::ZERO;
        }
        let (max_width, max_height) = if self.fit_each_page {
            (self.viewport.width, self.viewport.height)
        } else {
            (page.width * self.width_ratio, page.height * self.height_ratio)
        };
        match self.policy {
            FitPolicy::Width => fit_width(page, max_width),
            FitPolicy::Height => fit_height(page, max_height),
            FitPolicy::Both => fit_both(page, max_width, max_height),
        }
    }

    /// Scaled size of the widest page
    pub fn optimal_max_width_page(&self) -> ScaledSize {
        self.optimal_max_width_page
    }

    /// Scaled size of the tallest page
    pub fn optimal_max_height_page(&self) -> ScaledSize {
        self.optimal_max_height_page
    }

    pub fn policy(&self) -> FitPolicy {
        self.policy
    }
}
