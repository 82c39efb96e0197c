//! View-independent document viewing engine
//!
//! A [`DocumentSession`] owns one open document: its layout, the tile cache,
//! the visible range scheduler and the render worker. The embedding view
//! forwards viewport changes to the session, calls
//! [`DocumentSession::poll_events`] from its own loop and draws whatever
//! [`DocumentSession::thumbnails`] and [`DocumentSession::page_tiles`]
//! return.

pub mod config;
pub mod error;
pub mod events;
pub mod session;

pub use config::{ConfigError, ViewerConfig, DEFAULT_MAX_ZOOM, DEFAULT_MID_ZOOM, DEFAULT_MIN_ZOOM};
pub use error::{SessionError, SessionResult};
pub use events::{JumpTarget, ViewerEvent};
pub use session::DocumentSession;

pub use pageview_cache::{CacheConfig, CacheStats, RelativeBounds, Tile, TileKey};
pub use pageview_layout::{FitPolicy, LayoutOptions, PageSize, ScaledSize, ScrollAxis};
pub use pageview_render::{
    Bookmark, Color, ColorScheme, DocumentMeta, EngineError, FailureKind, RasterEngine,
    RenderFailure,
};
pub use pageview_scheduler::SchedulerConfig;

#[cfg(feature = "pdfium")]
pub use pageview_render::PdfiumEngine;
