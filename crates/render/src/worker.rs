//! Serialized render worker
//!
//! A single named thread consumes raster and text jobs in FIFO order, so at
//! most one engine call is in flight at any time. Results travel back over a
//! channel and are only delivered while the worker is running. Jobs queued
//! before [`RenderWorker::stop`] still execute, but their results are
//! dropped.

use crate::engine::{Color, RasterEngine};
use crate::error::{EngineError, FailureKind, RenderFailure};
use crate::geometry::RenderBounds;
use crate::highlight::{overlay_matches, SliceGeometry};
use crate::request::RasterRequest;
use image::RgbaImage;
use pageview_cache::Tile;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Largest bitmap the worker will allocate, in pixels
pub const DEFAULT_MAX_BITMAP_PIXELS: u64 = 8192 * 8192;

/// Worker settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Requests for larger bitmaps fail with an allocation error
    pub max_bitmap_pixels: u64,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_bitmap_pixels: DEFAULT_MAX_BITMAP_PIXELS,
        }
    }
}

/// Results delivered by the worker
#[derive(Debug)]
pub enum WorkerEvent {
    TileRendered(Tile),
    PageFailed(RenderFailure),
    /// `text` is `None` when the page has no characters
    TextExtracted { page: usize, text: Option<String> },
    TextFailed(RenderFailure),
}

enum Job {
    Render(RasterRequest),
    ExtractText { page: usize, document_page: usize },
    Shutdown,
}

/// Open state of one document page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageState {
    Opened,
    Failed,
}

/// Handle to the render thread
///
/// Dropping the handle shuts the thread down and waits for it.
pub struct RenderWorker {
    jobs: Sender<Job>,
    running: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Spawn the render thread
    ///
    /// The worker starts stopped; call [`start`](Self::start) to have
    /// results delivered on the returned receiver.
    pub fn spawn<E>(
        engine: Arc<Mutex<E>>,
        options: WorkerOptions,
    ) -> io::Result<(Self, Receiver<WorkerEvent>)>
    where
        E: RasterEngine + 'static,
    {
        let (jobs, queue) = mpsc::channel();
        let (events, results) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));

        let mut render_loop = RenderLoop {
            engine,
            options,
            pages: HashMap::new(),
            running: running.clone(),
            alive: alive.clone(),
            events,
        };

        let thread = thread::Builder::new()
            .name("pageview-render-worker".to_string())
            .spawn(move || render_loop.run(queue))?;

        Ok((
            Self {
                jobs,
                running,
                alive,
                thread: Some(thread),
            },
            results,
        ))
    }

    /// Queue a raster request. Never blocks.
    pub fn submit(&self, request: RasterRequest) {
        log::trace!(
            "queue page {} {:?} ({}x{}, order {})",
            request.page,
            request.bounds,
            request.width,
            request.height,
            request.cache_order
        );
        self.send(Job::Render(request));
    }

    /// Queue text extraction for a page
    pub fn extract_text(&self, page: usize, document_page: usize) {
        self.send(Job::ExtractText {
            page,
            document_page,
        });
    }

    fn send(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            log::warn!("render worker is gone, dropping job");
        }
    }

    /// Deliver results from now on
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Discard results from now on
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the thread and wait for it
    ///
    /// The job in progress completes. Jobs still queued are skipped.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop();
        self.alive.store(false, Ordering::Release);
        let _ = self.jobs.send(Job::Shutdown);
        if thread.join().is_err() {
            log::warn!("render worker panicked");
        }
        log::info!("render worker shut down");
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the render thread
struct RenderLoop<E> {
    engine: Arc<Mutex<E>>,
    options: WorkerOptions,
    pages: HashMap<usize, PageState>,
    running: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    events: Sender<WorkerEvent>,
}

impl<E: RasterEngine> RenderLoop<E> {
    fn run(&mut self, queue: Receiver<Job>) {
        for job in queue {
            if !self.alive.load(Ordering::Acquire) {
                break;
            }
            match job {
                Job::Render(request) => match self.render(request) {
                    Ok(Some(tile)) => self.deliver(WorkerEvent::TileRendered(tile)),
                    Ok(None) => {}
                    Err(failure) => {
                        log::warn!("{}", failure);
                        self.deliver(WorkerEvent::PageFailed(failure));
                    }
                },
                Job::ExtractText {
                    page,
                    document_page,
                } => match self.extract_text(page, document_page) {
                    Ok(text) => self.deliver(WorkerEvent::TextExtracted { page, text }),
                    Err(failure) => self.deliver(WorkerEvent::TextFailed(failure)),
                },
                Job::Shutdown => break,
            }
        }
    }

    fn deliver(&self, event: WorkerEvent) {
        if !self.running.load(Ordering::Acquire) {
            log::debug!("worker stopped, discarding {:?}", EventLabel(&event));
            return;
        }
        // The receiver is gone only while the session is being torn down
        let _ = self.events.send(event);
    }

    /// Open a page at most once
    ///
    /// Returns `Ok(false)` for a page that already failed, so the failure is
    /// reported only the first time.
    fn ensure_open(
        &mut self,
        engine: &mut E,
        page: usize,
        document_page: usize,
    ) -> Result<bool, RenderFailure> {
        match self.pages.get(&document_page) {
            Some(PageState::Opened) => Ok(true),
            Some(PageState::Failed) => Ok(false),
            None => match engine.open_page(document_page) {
                Ok(()) => {
                    self.pages.insert(document_page, PageState::Opened);
                    Ok(true)
                }
                Err(err) => {
                    self.pages.insert(document_page, PageState::Failed);
                    Err(RenderFailure::new(page, FailureKind::PageOpen, err.to_string()))
                }
            },
        }
    }

    fn render(&mut self, request: RasterRequest) -> Result<Option<Tile>, RenderFailure> {
        let (width, height) = request.pixel_size();
        if width == 0 || height == 0 || request.bounds.is_empty() {
            return Ok(None);
        }

        let engine = self.engine.clone();
        let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
        let page = request.page;
        let document_page = request.document_page;

        if !self.ensure_open(&mut *engine, page, document_page)? {
            return Ok(None);
        }

        let native = engine
            .page_size(document_page)
            .map_err(|err| RenderFailure::from_engine(page, &err))?;

        let appearance = request.appearance;
        let mut bitmap = allocate_bitmap(width, height, appearance.fill(), self.options)
            .map_err(|err| RenderFailure::from_engine(page, &err.for_page(page)))?;

        let render = RenderBounds::for_slice(width, height, request.bounds);
        engine
            .render_bitmap(
                &mut bitmap,
                document_page,
                render,
                request.annotation_rendering,
                request.best_quality,
                appearance.color_scheme.as_ref(),
            )
            .map_err(|err| RenderFailure::from_engine(page, &err))?;

        if !request.search_query.is_empty() {
            let geometry = SliceGeometry {
                native,
                render,
                slice: request.bounds,
                bitmap_width: width,
                bitmap_height: height,
            };
            match engine.search(document_page, &request.search_query, false, false) {
                Ok(matches) => {
                    let regions =
                        overlay_matches(&mut bitmap, matches, &geometry, appearance.highlight);
                    log::trace!("page {}: {} highlight(s)", page, regions.len());
                }
                Err(err) => log::warn!("search failed on page {}: {}", page, err),
            }
        }

        Ok(Some(Tile::new(request.key(), request.cache_order, bitmap)))
    }

    fn extract_text(
        &mut self,
        page: usize,
        document_page: usize,
    ) -> Result<Option<String>, RenderFailure> {
        let engine = self.engine.clone();
        let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.ensure_open(&mut *engine, page, document_page)? {
            return Err(RenderFailure::new(
                page,
                FailureKind::PageOpen,
                format!("page {} could not be opened", page),
            ));
        }

        let count = engine
            .count_characters(document_page)
            .map_err(|err| RenderFailure::from_engine(page, &err))?;
        if count == 0 {
            return Ok(None);
        }
        engine
            .extract_characters(document_page, 0, count)
            .map(Some)
            .map_err(|err| RenderFailure::from_engine(page, &err))
    }
}

/// Allocate a `width` x `height` bitmap filled with `fill`
///
/// Oversized or unallocatable bitmaps are reported instead of aborting.
fn allocate_bitmap(
    width: u32,
    height: u32,
    fill: Color,
    options: WorkerOptions,
) -> Result<RgbaImage, AllocationError> {
    let error = AllocationError { width, height };
    let pixels = u64::from(width) * u64::from(height);
    if pixels > options.max_bitmap_pixels {
        return Err(error);
    }
    let len = usize::try_from(pixels)
        .ok()
        .and_then(|p| p.checked_mul(4))
        .ok_or(error)?;

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| error)?;
    let rgba = fill.to_rgba().0;
    for _ in 0..pixels {
        buffer.extend_from_slice(&rgba);
    }
    RgbaImage::from_raw(width, height, buffer).ok_or(error)
}

#[derive(Debug, Clone, Copy)]
struct AllocationError {
    width: u32,
    height: u32,
}

impl AllocationError {
    fn for_page(self, page: usize) -> EngineError {
        EngineError::Allocation {
            page,
            width: self.width,
            height: self.height,
        }
    }
}

/// Short description of an event for logs, without pixel data
struct EventLabel<'a>(&'a WorkerEvent);

impl std::fmt::Debug for EventLabel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            WorkerEvent::TileRendered(tile) => write!(
                f,
                "tile for page {} ({}x{})",
                tile.page(),
                tile.width(),
                tile.height()
            ),
            WorkerEvent::PageFailed(failure) => write!(f, "failure: {}", failure),
            WorkerEvent::TextExtracted { page, .. } => write!(f, "text of page {}", page),
            WorkerEvent::TextFailed(failure) => write!(f, "text failure: {}", failure),
        }
    }
}
