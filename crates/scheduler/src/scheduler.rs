//! Visible range scheduling
//!
//! One pass turns the viewport into raster requests: a new cache generation
//! is started, the pages around the viewport are found, every page gets a
//! thumbnail request and then its visible tiles are looked up or requested
//! in row-major order until the per-pass budget is spent.

use crate::config::SchedulerConfig;
use crate::grid::TileGrid;
use crate::viewport::ViewportState;
use pageview_cache::{RelativeBounds, TileCache, TileKey};
use pageview_layout::{DocumentLayout, ScrollAxis};
use pageview_render::{Appearance, PageRect, RasterRequest};

/// Per-pass rendering settings copied into every request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub search_query: String,
    pub best_quality: bool,
    pub annotation_rendering: bool,
    pub appearance: Appearance,
}

/// Result of one scheduling pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulePlan {
    /// Cache misses to hand to the worker, thumbnails first
    pub requests: Vec<RasterRequest>,
    /// Tiles found in the cache
    pub hits: usize,
    pub first_page: usize,
    pub last_page: usize,
}

impl SchedulePlan {
    /// Number of page tile requests, thumbnails excluded
    pub fn tile_requests(&self) -> usize {
        self.requests.iter().filter(|r| !r.thumbnail).count()
    }

    pub fn thumbnail_requests(&self) -> usize {
        self.requests.iter().filter(|r| r.thumbnail).count()
    }
}

/// Decides which tiles a viewport needs
///
/// Owns the cache order counter, so orders keep increasing across passes
/// and the most recently wanted tiles are always evicted last.
#[derive(Debug, Clone)]
pub struct VisibleRangeScheduler {
    config: SchedulerConfig,
    next_order: u64,
}

impl VisibleRangeScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            next_order: 1,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Restart cache orders, for a freshly loaded document
    pub fn reset(&mut self) {
        self.next_order = 1;
    }

    fn take_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    /// Run one scheduling pass
    pub fn schedule(
        &mut self,
        layout: &DocumentLayout,
        viewport: &ViewportState,
        cache: &TileCache,
        context: &RequestContext,
    ) -> SchedulePlan {
        cache.begin_new_generation();

        let mut plan = SchedulePlan::default();
        if layout.pages_count() == 0 || viewport.is_degenerate() {
            return plan;
        }

        let axis = layout.axis();
        let zoom = viewport.zoom;
        let area = viewport.preload_rect(axis, self.config.preload_offset);
        let (start, end) = match axis {
            ScrollAxis::Vertical => (area.top, area.bottom),
            ScrollAxis::Horizontal => (area.left, area.right),
        };
        plan.first_page = layout.page_at_offset(start, zoom);
        plan.last_page = layout.page_at_offset(end, zoom);

        for page in plan.first_page..=plan.last_page {
            self.request_thumbnail(layout, page, cache, context, &mut plan);
        }

        let mut budget = self.config.max_tiles_per_pass;
        for page in plan.first_page..=plan.last_page {
            if budget == 0 {
                break;
            }
            self.request_tiles(layout, page, viewport, area, cache, context, &mut budget, &mut plan);
        }

        log::debug!(
            "scheduled pages {}..={}: {} request(s), {} hit(s)",
            plan.first_page,
            plan.last_page,
            plan.requests.len(),
            plan.hits
        );
        plan
    }

    fn request_thumbnail(
        &self,
        layout: &DocumentLayout,
        page: usize,
        cache: &TileCache,
        context: &RequestContext,
        plan: &mut SchedulePlan,
    ) {
        let (Some(document_page), Some(size)) = (layout.document_page(page), layout.page_size(page))
        else {
            return;
        };
        if size.is_degenerate() {
            return;
        }
        if cache.contains_thumbnail(&TileKey::thumbnail(page, &context.search_query)) {
            return;
        }

        let ratio = self.config.thumbnail_ratio;
        plan.requests.push(RasterRequest {
            page,
            document_page,
            width: size.width * ratio,
            height: size.height * ratio,
            bounds: RelativeBounds::FULL,
            thumbnail: true,
            cache_order: 0,
            best_quality: context.best_quality,
            annotation_rendering: context.annotation_rendering,
            search_query: context.search_query.clone(),
            appearance: context.appearance,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn request_tiles(
        &mut self,
        layout: &DocumentLayout,
        page: usize,
        viewport: &ViewportState,
        area: PageRect,
        cache: &TileCache,
        context: &RequestContext,
        budget: &mut usize,
        plan: &mut SchedulePlan,
    ) {
        let Some(document_page) = layout.document_page(page) else {
            return;
        };
        let zoom = viewport.zoom;
        let size = layout.scaled_page_size(page, zoom);
        let Some(grid) = TileGrid::for_page(size, self.config.tile_size) else {
            return;
        };

        // Preload area relative to this page
        let primary = layout.page_offset(page, zoom);
        let secondary = layout.secondary_offset(page, zoom);
        let (x, y) = match layout.axis() {
            ScrollAxis::Vertical => (secondary, primary),
            ScrollAxis::Horizontal => (primary, secondary),
        };
        let relative = area
            .translate(-x, -y)
            .scale(1.0 / size.width, 1.0 / size.height);
        let Some((rows, cols)) = grid.cells_covering(relative) else {
            return;
        };

        for row in rows {
            for col in cols.clone() {
                if *budget == 0 {
                    return;
                }
                let Some(cell) = grid.cell(row, col) else {
                    continue;
                };
                *budget -= 1;

                let order = self.take_order();
                let key = TileKey::new(page, cell.bounds, false, &context.search_query);
                if cache.lookup_and_promote(&key, order) {
                    plan.hits += 1;
                    continue;
                }

                plan.requests.push(RasterRequest {
                    page,
                    document_page,
                    width: cell.width,
                    height: cell.height,
                    bounds: cell.bounds,
                    thumbnail: false,
                    cache_order: order,
                    best_quality: context.best_quality,
                    annotation_rendering: context.annotation_rendering,
                    search_query: context.search_query.clone(),
                    appearance: context.appearance,
                });
            }
        }
    }
}

impl Default for VisibleRangeScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
