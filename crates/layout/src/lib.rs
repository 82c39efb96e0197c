//! Page layout for continuous document views
//!
//! Turns intrinsic page sizes into on-screen sizes according to a fit policy,
//! and lays the scaled pages out along a scroll axis with fixed or automatic
//! spacing.
//!
//! # Example
//!
//! ```
//! use pageview_layout::{DocumentLayout, FitPolicy, LayoutOptions, PageSize, ScaledSize};
//!
//! let pages = vec![PageSize::new(2000.0, 3200.0)];
//! let options = LayoutOptions::default().with_fit_policy(FitPolicy::Width);
//! let mut layout = DocumentLayout::new(pages, options, None);
//!
//! layout.recompute(ScaledSize::new(1000.0, 1600.0));
//! assert_eq!(layout.page_size(0), Some(ScaledSize::new(1000.0, 1600.0)));
//! ```

mod document;
mod fit;
mod size;

pub use document::{DocumentLayout, LayoutOptions};
pub use fit::{fit_both, fit_height, fit_width, FitPolicy, PageLayoutCalculator};
pub use size::{PageSize, ScaledSize, ScrollAxis};
