//! Document session
//!
//! Ties the layout, the tile cache, the scheduler and the render worker
//! together behind the controls a view needs. Every control that changes
//! what is visible runs one scheduling pass and hands the misses to the
//! worker; results are collected with [`DocumentSession::poll_events`].

use crate::config::ViewerConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{JumpTarget, ViewerEvent};
use pageview_cache::{CacheStats, Tile, TileCache};
use pageview_layout::{DocumentLayout, PageSize, ScaledSize, ScrollAxis};
use pageview_render::{
    Bookmark, ColorScheme, DocumentMeta, RasterEngine, RenderWorker, WorkerEvent,
};
use pageview_scheduler::{RequestContext, ViewportState, VisibleRangeScheduler};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex};

/// One open document and everything needed to display it
///
/// The engine is handed to the render worker and only ever locked on its
/// thread. Metadata and bookmarks are read once while opening, so no
/// control here waits behind a render.
pub struct DocumentSession<E: RasterEngine + 'static> {
    config: ViewerConfig,
    layout: DocumentLayout,
    cache: TileCache,
    scheduler: VisibleRangeScheduler,
    worker: RenderWorker,
    results: Receiver<WorkerEvent>,
    viewport: ViewportState,
    search_query: String,
    color_scheme: Option<ColorScheme>,
    metadata: DocumentMeta,
    bookmarks: Vec<Bookmark>,
    pending: VecDeque<ViewerEvent>,
    closed: bool,
    engine: PhantomData<fn() -> E>,
}

impl<E: RasterEngine + 'static> DocumentSession<E> {
    /// Open a document in a viewport of `width` x `height` pixels
    ///
    /// Lays the pages out, starts the render worker, queues
    /// [`ViewerEvent::LoadComplete`] and jumps to the configured default
    /// page.
    pub fn open(engine: E, config: ViewerConfig, width: f32, height: f32) -> SessionResult<Self> {
        config.validate()?;

        let count = engine.page_count();
        if count == 0 {
            return Err(SessionError::EmptyDocument);
        }
        let order: Vec<usize> = match &config.user_pages {
            Some(pages) => {
                if pages.is_empty() {
                    return Err(SessionError::EmptyDocument);
                }
                if let Some(&bad) = pages.iter().find(|&&p| p >= count) {
                    return Err(SessionError::InvalidPage(bad));
                }
                pages.clone()
            }
            None => (0..count).collect(),
        };
        let sizes = order
            .iter()
            .map(|&page| engine.page_size(page))
            .collect::<Result<Vec<PageSize>, _>>()?;
        let metadata = engine.metadata();
        let bookmarks = engine.bookmarks();

        let mut layout =
            DocumentLayout::new(sizes, config.layout_options(), config.user_pages.clone());
        layout.recompute(ScaledSize::new(width, height));

        let (worker, results) =
            RenderWorker::spawn(Arc::new(Mutex::new(engine)), config.worker_options())
                .map_err(SessionError::WorkerSpawn)?;
        worker.start();

        let pages = layout.pages_count();
        let mut session = Self {
            cache: TileCache::new(config.cache),
            scheduler: VisibleRangeScheduler::new(config.scheduler),
            color_scheme: config.color_scheme,
            viewport: ViewportState::new(width, height).with_zoom(config.min_zoom),
            config,
            layout,
            worker,
            results,
            search_query: String::new(),
            metadata,
            bookmarks,
            pending: VecDeque::new(),
            closed: false,
            engine: PhantomData,
        };
        log::info!("opened document with {} page(s)", pages);
        session.pending.push_back(ViewerEvent::LoadComplete { pages });

        let default_page = session.config.default_page;
        session.jump_to(default_page, false);
        Ok(session)
    }

    /// Close the session and open `engine` in its place with the same
    /// configuration and viewport
    pub fn reload(&mut self, engine: E) -> SessionResult<()> {
        self.close();
        let config = self.config.clone();
        *self = Self::open(engine, config, self.viewport.width, self.viewport.height)?;
        Ok(())
    }

    /// Stop rendering and drop every cached bitmap
    ///
    /// Queued results are discarded. Further controls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.worker.stop();
        self.cache.clear();
        self.worker.shutdown();
        while self.results.try_recv().is_ok() {}
        self.pending.clear();
        log::info!("document session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Collect everything the worker delivered since the last call
    ///
    /// Rendered tiles are inserted into the cache here, so a
    /// [`ViewerEvent::TileReady`] always refers to a tile that can be drawn.
    pub fn poll_events(&mut self) -> Vec<ViewerEvent> {
        if self.closed {
            return Vec::new();
        }
        let mut events: Vec<ViewerEvent> = self.pending.drain(..).collect();
        loop {
            match self.results.try_recv() {
                Ok(event) => events.extend(self.handle_worker_event(event)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("render worker disconnected");
                    break;
                }
            }
        }
        events
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) -> Option<ViewerEvent> {
        match event {
            WorkerEvent::TileRendered(tile) => {
                let page = tile.page();
                let thumbnail = tile.is_thumbnail();
                if thumbnail {
                    if !self.cache.insert_thumbnail(tile) {
                        return None;
                    }
                } else {
                    self.cache.insert(tile);
                }
                Some(ViewerEvent::TileReady { page, thumbnail })
            }
            WorkerEvent::PageFailed(failure) => {
                log::warn!("page {} failed: {}", failure.page, failure.message);
                Some(ViewerEvent::PageError(failure))
            }
            WorkerEvent::TextExtracted { page, text } => {
                Some(ViewerEvent::TextExtracted { page, text: Ok(text) })
            }
            WorkerEvent::TextFailed(failure) => Some(ViewerEvent::TextExtracted {
                page: failure.page,
                text: Err(failure),
            }),
        }
    }

    /// The viewport changed size; keeps the point at its center in place
    pub fn resize(&mut self, width: f32, height: f32) {
        if self.closed {
            return;
        }
        let zoom = self.viewport.zoom;
        let (old_width, old_height) = self.content_size(zoom);
        let center_x = relative(self.viewport.scroll_x + self.viewport.width / 2.0, old_width);
        let center_y = relative(self.viewport.scroll_y + self.viewport.height / 2.0, old_height);

        self.viewport.width = width;
        self.viewport.height = height;
        self.layout.recompute(ScaledSize::new(width, height));

        let (new_width, new_height) = self.content_size(zoom);
        self.move_to(
            center_x * new_width - width / 2.0,
            center_y * new_height - height / 2.0,
        );
    }

    /// Scroll to absolute offsets in zoomed document pixels
    pub fn scroll_to(&mut self, x: f32, y: f32) {
        self.move_to(x, y);
    }

    pub fn scroll_by(&mut self, dx: f32, dy: f32) {
        self.move_to(self.viewport.scroll_x + dx, self.viewport.scroll_y + dy);
    }

    /// Scroll along the scroll axis only, keeping the cross offset
    pub fn scroll_axis_to(&mut self, offset: f32) {
        match self.layout.axis() {
            ScrollAxis::Vertical => self.move_to(self.viewport.scroll_x, offset),
            ScrollAxis::Horizontal => self.move_to(offset, self.viewport.scroll_y),
        }
    }

    /// Change the zoom level, keeping the scroll offsets
    pub fn zoom_to(&mut self, zoom: f32) {
        if self.closed {
            return;
        }
        self.viewport.zoom = self.config.clamp_zoom(zoom);
        self.move_to(self.viewport.scroll_x, self.viewport.scroll_y);
    }

    /// Change the zoom level, keeping the document point under `pivot`
    /// (viewport pixels) in place
    pub fn zoom_centered(&mut self, zoom: f32, pivot_x: f32, pivot_y: f32) {
        if self.closed {
            return;
        }
        let zoom = self.config.clamp_zoom(zoom);
        let factor = zoom / self.viewport.zoom;
        let x = (self.viewport.scroll_x + pivot_x) * factor - pivot_x;
        let y = (self.viewport.scroll_y + pivot_y) * factor - pivot_y;
        self.viewport.zoom = zoom;
        self.move_to(x, y);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom_to(self.config.min_zoom);
    }

    pub fn zoom(&self) -> f32 {
        self.viewport.zoom
    }

    /// Next step of the min, mid, max zoom cycle
    pub fn next_zoom_level(&self) -> f32 {
        let zoom = self.viewport.zoom;
        if zoom < self.config.mid_zoom {
            self.config.mid_zoom
        } else if zoom < self.config.max_zoom {
            self.config.max_zoom
        } else {
            self.config.min_zoom
        }
    }

    pub fn is_zooming(&self) -> bool {
        self.viewport.zoom != self.config.min_zoom
    }

    /// Highlight `query` in every tile rendered from now on
    ///
    /// Tiles are keyed by query, so the next pass requests highlighted
    /// copies while the plain ones age out of the cache.
    pub fn set_search_query(&mut self, query: &str) {
        if self.closed || self.search_query == query {
            return;
        }
        self.search_query = query.to_string();
        self.schedule();
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Replace the color scheme; cached bitmaps are dropped and re-rendered
    pub fn override_color_scheme(&mut self, scheme: Option<ColorScheme>) {
        if self.closed || self.color_scheme == scheme {
            return;
        }
        self.color_scheme = scheme;
        self.cache.clear();
        self.schedule();
    }

    pub fn color_scheme(&self) -> Option<ColorScheme> {
        self.color_scheme
    }

    /// Jump to the start of a user page, clamped to the document
    ///
    /// A non-animated jump moves immediately. An animated one only reports
    /// the offsets to animate between.
    pub fn jump_to(&mut self, page: usize, animated: bool) -> JumpTarget {
        let page = self.layout.valid_page_from(page);
        let zoom = self.viewport.zoom;
        let axis = self.layout.axis();
        let target = if page == 0 {
            0.0
        } else {
            self.layout.page_offset(page, zoom)
        };
        let (content, extent) = self.primary_content_and_extent();
        let jump = JumpTarget {
            page,
            from: self.viewport.primary_scroll(axis),
            to: clamp_axis(target, content, extent),
            animated,
        };
        if !animated {
            self.scroll_axis_to(jump.to);
        }
        jump
    }

    /// Scroll progress through the document, from 0 to 1
    pub fn position_offset(&self) -> f32 {
        let (content, extent) = self.primary_content_and_extent();
        let range = content - extent;
        if range <= 0.0 {
            return 0.0;
        }
        (self.viewport.primary_scroll(self.layout.axis()) / range).clamp(0.0, 1.0)
    }

    pub fn set_position_offset(&mut self, progress: f32) {
        let (content, extent) = self.primary_content_and_extent();
        let range = (content - extent).max(0.0);
        self.scroll_axis_to(progress.clamp(0.0, 1.0) * range);
    }

    /// User page at the middle of the viewport
    pub fn current_page(&self) -> usize {
        let axis = self.layout.axis();
        let scroll = self.viewport.primary_scroll(axis);
        let (content, extent) = self.primary_content_and_extent();
        let last = self.layout.pages_count().saturating_sub(1);

        if scroll < 1.0 {
            0
        } else if content > extent && scroll >= content - extent - 1.0 {
            last
        } else {
            self.layout
                .page_at_offset(scroll + extent / 2.0, self.viewport.zoom)
                .min(last)
        }
    }

    /// Queue text extraction for user pages
    ///
    /// Every page is checked before anything is queued. Results arrive as
    /// [`ViewerEvent::TextExtracted`].
    pub fn extract_text(&mut self, pages: &[usize]) -> SessionResult<()> {
        let mut jobs = Vec::with_capacity(pages.len());
        for &page in pages {
            let document_page = self
                .layout
                .document_page(page)
                .ok_or(SessionError::InvalidPage(page))?;
            jobs.push((page, document_page));
        }
        if self.closed {
            return Ok(());
        }
        for (page, document_page) in jobs {
            self.worker.extract_text(page, document_page);
        }
        Ok(())
    }

    /// Cached page tiles in draw order
    pub fn page_tiles(&self) -> Vec<Arc<Tile>> {
        self.cache.page_tiles()
    }

    /// Cached thumbnails, oldest first
    pub fn thumbnails(&self) -> Vec<Arc<Tile>> {
        self.cache.thumbnails()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn pages_count(&self) -> usize {
        self.layout.pages_count()
    }

    pub fn metadata(&self) -> &DocumentMeta {
        &self.metadata
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// Move to the given offsets, clamped to the document, and reschedule
    ///
    /// Content narrower than the viewport on an axis is centered on it.
    fn move_to(&mut self, x: f32, y: f32) {
        if self.closed {
            return;
        }
        let (width, height) = self.content_size(self.viewport.zoom);
        self.viewport.scroll_x = clamp_axis(x, width, self.viewport.width);
        self.viewport.scroll_y = clamp_axis(y, height, self.viewport.height);
        self.schedule();
    }

    /// Zoomed content extent as (width, height)
    fn content_size(&self, zoom: f32) -> (f32, f32) {
        let length = self.layout.document_length(zoom);
        match self.layout.axis() {
            ScrollAxis::Vertical => (self.layout.max_page_width() * zoom, length),
            ScrollAxis::Horizontal => (length, self.layout.max_page_height() * zoom),
        }
    }

    fn primary_content_and_extent(&self) -> (f32, f32) {
        let axis = self.layout.axis();
        (
            self.layout.document_length(self.viewport.zoom),
            self.viewport.primary_extent(axis),
        )
    }

    fn request_context(&self) -> RequestContext {
        let mut appearance = self.config.appearance();
        appearance.color_scheme = self.color_scheme;
        RequestContext {
            search_query: self.search_query.clone(),
            best_quality: self.config.best_quality,
            annotation_rendering: self.config.annotation_rendering,
            appearance,
        }
    }

    fn schedule(&mut self) {
        if self.closed {
            return;
        }
        let context = self.request_context();
        let plan = self
            .scheduler
            .schedule(&self.layout, &self.viewport, &self.cache, &context);
        for request in plan.requests {
            self.worker.submit(request);
        }
    }
}

#[cfg(feature = "pdfium")]
impl DocumentSession<pageview_render::PdfiumEngine> {
    /// Open a PDF file with the password from `config`
    pub fn open_file<P: AsRef<std::path::Path>>(
        path: P,
        config: ViewerConfig,
        width: f32,
        height: f32,
    ) -> SessionResult<Self> {
        let engine = pageview_render::PdfiumEngine::open(path, config.password.as_deref())?;
        Self::open(engine, config, width, height)
    }
}

impl<E: RasterEngine + 'static> Drop for DocumentSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Offset on one axis: centered when the content is smaller than the
/// viewport, otherwise kept inside `[0, content - extent]`
fn clamp_axis(offset: f32, content: f32, extent: f32) -> f32 {
    if content < extent {
        -(extent - content) / 2.0
    } else if offset.is_nan() {
        0.0
    } else {
        offset.clamp(0.0, content - extent)
    }
}

fn relative(position: f32, length: f32) -> f32 {
    if length > 0.0 {
        position / length
    } else {
        0.0
    }
}
