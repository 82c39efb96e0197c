//! Rasterization for the page viewer
//!
//! Defines the [`RasterEngine`] boundary to a document backend and the
//! [`RenderWorker`] that turns [`RasterRequest`]s into tiles on a single
//! background thread.

pub mod engine;
pub mod error;
pub mod geometry;
pub mod highlight;
pub mod request;
pub mod worker;

#[cfg(feature = "pdfium")]
pub mod pdf;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use engine::{Bookmark, Color, ColorScheme, DocumentMeta, RasterEngine};
pub use error::{EngineError, EngineResult, FailureKind, RenderFailure};
pub use geometry::{PageRect, PixelRect, RenderBounds};
pub use highlight::{overlay_matches, SliceGeometry};
pub use request::{Appearance, RasterRequest};
pub use worker::{RenderWorker, WorkerEvent, WorkerOptions, DEFAULT_MAX_BITMAP_PIXELS};

#[cfg(feature = "pdfium")]
pub use pdf::PdfiumEngine;
