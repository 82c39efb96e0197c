//! Rasterization errors

/// Errors reported by a [`RasterEngine`](crate::RasterEngine)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to open page {page}: {reason}")]
    PageOpen { page: usize, reason: String },

    #[error("failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("cannot allocate a {width}x{height} bitmap for page {page}")]
    Allocation { page: usize, width: u32, height: u32 },

    #[error("page {0} out of range")]
    InvalidPage(usize),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// What went wrong while producing a tile or page text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The page could not be opened; later requests for it are skipped
    PageOpen,
    /// The output bitmap could not be allocated
    Allocation,
    /// The engine failed after the page was opened
    Render,
}

/// Typed failure delivered from the worker, keyed by user page index
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("page {page}: {message}")]
pub struct RenderFailure {
    pub page: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl RenderFailure {
    pub fn new(page: usize, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            page,
            kind,
            message: message.into(),
        }
    }

    /// Classify an engine error for the given user page
    pub fn from_engine(page: usize, error: &EngineError) -> Self {
        let kind = match error {
            EngineError::PageOpen { .. } | EngineError::InvalidPage(_) => FailureKind::PageOpen,
            EngineError::Allocation { .. } => FailureKind::Allocation,
            EngineError::Render { .. } | EngineError::Backend(_) => FailureKind::Render,
        };
        Self::new(page, kind, error.to_string())
    }
}
