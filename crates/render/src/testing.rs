//! Deterministic in-memory engine for tests

use crate::engine::{Bookmark, ColorScheme, DocumentMeta, RasterEngine};
use crate::error::{EngineError, EngineResult};
use crate::geometry::{PageRect, PixelRect};
use image::{Rgba, RgbaImage};
use pageview_layout::PageSize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

const FRAME: Rgba<u8> = Rgba([220, 220, 220, 255]);

/// Call counts shared by every clone of a [`MemoryEngine`]
///
/// Keep a handle before giving the engine away to read the counts without
/// going through whoever owns it.
#[derive(Debug, Default)]
pub struct EngineCounters {
    open_attempts: Mutex<HashMap<usize, usize>>,
    calls: AtomicUsize,
    best_quality_renders: AtomicUsize,
}

impl EngineCounters {
    /// How often `open_page` was called for a document page
    pub fn open_attempts(&self, page: usize) -> usize {
        let attempts = self
            .open_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        attempts.get(&page).copied().unwrap_or(0)
    }

    /// Number of render and character-count calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Renders that asked for print quality
    pub fn best_quality_renders(&self) -> usize {
        self.best_quality_renders.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct GateState {
    released: bool,
    waiting: usize,
}

/// Holds every render until released
#[derive(Debug, Default)]
pub struct RenderGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl RenderGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Let held and future renders through
    pub fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.released = true;
        self.changed.notify_all();
    }

    /// Wait until a render is held at the gate, false on timeout
    pub fn wait_for_render(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while state.waiting == 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn pass(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.waiting += 1;
        self.changed.notify_all();
        while !state.released {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.waiting -= 1;
    }
}

/// Engine over fixed page sizes
///
/// Pages render as a light frame around the page area. Open failures,
/// search matches, page text, metadata and bookmarks can be injected.
/// Clones share their [`EngineCounters`].
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    sizes: Vec<PageSize>,
    broken: HashSet<usize>,
    matches: HashMap<(usize, String), Vec<PageRect>>,
    text: HashMap<usize, String>,
    metadata: DocumentMeta,
    bookmarks: Vec<Bookmark>,
    blank: bool,
    gate: Option<Arc<RenderGate>>,
    counters: Arc<EngineCounters>,
}

impl MemoryEngine {
    pub fn new(sizes: Vec<PageSize>) -> Self {
        Self {
            sizes,
            ..Self::default()
        }
    }

    /// `count` pages of the same size
    pub fn uniform(count: usize, width: f32, height: f32) -> Self {
        Self::new(vec![PageSize::new(width, height); count])
    }

    /// Make `open_page` fail for a document page
    pub fn with_broken_page(mut self, page: usize) -> Self {
        self.broken.insert(page);
        self
    }

    /// Report `rect` when `query` is searched on `page` (case-insensitive)
    pub fn with_match(mut self, page: usize, query: &str, rect: PageRect) -> Self {
        self.matches
            .entry((page, query.to_lowercase()))
            .or_default()
            .push(rect);
        self
    }

    pub fn with_text(mut self, page: usize, text: &str) -> Self {
        self.text.insert(page, text.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: DocumentMeta) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_bookmarks(mut self, bookmarks: Vec<Bookmark>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    /// Leave bitmaps untouched when rendering
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Hold renders at `gate` until it is released
    pub fn with_gate(mut self, gate: Arc<RenderGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn counters(&self) -> Arc<EngineCounters> {
        Arc::clone(&self.counters)
    }

    pub fn open_attempts(&self, page: usize) -> usize {
        self.counters.open_attempts(page)
    }

    pub fn calls(&self) -> usize {
        self.counters.calls()
    }

    fn check(&self, page: usize) -> EngineResult<()> {
        if page < self.sizes.len() {
            Ok(())
        } else {
            Err(EngineError::InvalidPage(page))
        }
    }
}

impl RasterEngine for MemoryEngine {
    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn page_size(&self, page: usize) -> EngineResult<PageSize> {
        self.sizes
            .get(page)
            .copied()
            .ok_or(EngineError::InvalidPage(page))
    }

    fn open_page(&mut self, page: usize) -> EngineResult<()> {
        *self
            .counters
            .open_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(page)
            .or_default() += 1;
        self.check(page)?;
        if self.broken.contains(&page) {
            return Err(EngineError::PageOpen {
                page,
                reason: "damaged page".to_string(),
            });
        }
        Ok(())
    }

    fn render_bitmap(
        &mut self,
        bitmap: &mut RgbaImage,
        page: usize,
        rect: PixelRect,
        _annotations: bool,
        best_quality: bool,
        color_scheme: Option<&ColorScheme>,
    ) -> EngineResult<()> {
        self.check(page)?;
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        if best_quality {
            self.counters
                .best_quality_renders
                .fetch_add(1, Ordering::SeqCst);
        }
        if self.blank {
            return Ok(());
        }

        let frame = color_scheme.map_or(FRAME, |scheme| scheme.recolor(FRAME));
        let (width, height) = (bitmap.width() as i32, bitmap.height() as i32);
        for y in rect.top.max(0)..rect.bottom.min(height) {
            for x in rect.left.max(0)..rect.right.min(width) {
                let edge = x == rect.left
                    || x == rect.right - 1
                    || y == rect.top
                    || y == rect.bottom - 1;
                if edge {
                    bitmap.put_pixel(x as u32, y as u32, frame);
                }
            }
        }
        Ok(())
    }

    fn search<'a>(
        &'a mut self,
        page: usize,
        query: &str,
        _match_case: bool,
        _whole_word: bool,
    ) -> EngineResult<Box<dyn Iterator<Item = PageRect> + 'a>> {
        self.check(page)?;
        let found = self
            .matches
            .get(&(page, query.to_lowercase()))
            .map(|rects| rects.as_slice())
            .unwrap_or(&[]);
        Ok(Box::new(found.iter().copied()))
    }

    fn count_characters(&mut self, page: usize) -> EngineResult<usize> {
        self.check(page)?;
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.get(&page).map_or(0, |text| text.chars().count()))
    }

    fn extract_characters(
        &mut self,
        page: usize,
        start: usize,
        length: usize,
    ) -> EngineResult<String> {
        self.check(page)?;
        let text = self.text.get(&page).map(String::as_str).unwrap_or("");
        Ok(text.chars().skip(start).take(length).collect())
    }

    fn metadata(&self) -> DocumentMeta {
        self.metadata.clone()
    }

    fn bookmarks(&self) -> Vec<Bookmark> {
        self.bookmarks.clone()
    }
}
