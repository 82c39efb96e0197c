//! Notifications delivered to the embedding view

use pageview_render::RenderFailure;

/// Something the view should react to
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The document is open and laid out
    LoadComplete { pages: usize },
    /// A tile or thumbnail landed in the cache; the view should redraw
    TileReady { page: usize, thumbnail: bool },
    /// A page could not be rendered
    PageError(RenderFailure),
    /// Text of a page, `Ok(None)` when the page has no characters
    TextExtracted {
        page: usize,
        text: Result<Option<String>, RenderFailure>,
    },
}

/// Scroll positions of a page jump along the scroll axis
///
/// For an animated jump the session does not move; the view animates from
/// `from` to `to` through [`scroll_to`](crate::DocumentSession::scroll_to).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpTarget {
    pub page: usize,
    pub from: f32,
    pub to: f32,
    pub animated: bool,
}
