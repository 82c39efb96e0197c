//! Visible range scheduling for tiled page rendering
//!
//! Given a [`DocumentLayout`](pageview_layout::DocumentLayout), a
//! [`ViewportState`] and a [`TileCache`](pageview_cache::TileCache), the
//! [`VisibleRangeScheduler`] decides which thumbnails and tiles a view needs,
//! reuses what is cached and returns raster requests for the rest.
//!
//! # Example
//!
//! ```
//! use pageview_cache::TileCache;
//! use pageview_layout::{DocumentLayout, LayoutOptions, PageSize, ScaledSize};
//! use pageview_scheduler::{RequestContext, ViewportState, VisibleRangeScheduler};
//!
//! let mut layout = DocumentLayout::new(
//!     vec![PageSize::new(612.0, 792.0); 3],
//!     LayoutOptions::default(),
//!     None,
//! );
//! layout.recompute(ScaledSize::new(800.0, 600.0));
//!
//! let cache = TileCache::default();
//! let mut scheduler = VisibleRangeScheduler::default();
//! let viewport = ViewportState::new(800.0, 600.0);
//!
//! let plan = scheduler.schedule(&layout, &viewport, &cache, &RequestContext::default());
//! assert_eq!(plan.first_page, 0);
//! assert!(plan.requests[0].thumbnail);
//! ```

pub mod config;
pub mod grid;
pub mod scheduler;
pub mod viewport;

pub use config::{
    SchedulerConfig, DEFAULT_PRELOAD_OFFSET, DEFAULT_THUMBNAIL_RATIO, DEFAULT_TILE_SIZE,
};
pub use grid::{TileCell, TileGrid};
pub use scheduler::{RequestContext, SchedulePlan, VisibleRangeScheduler};
pub use viewport::ViewportState;
