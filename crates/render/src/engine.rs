//! Boundary to the document rasterization backend

use crate::error::EngineResult;
use crate::geometry::{PageRect, PixelRect};
use image::{Rgba, RgbaImage};
use pageview_layout::PageSize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rasterization capability backing a document session
///
/// Page indices are document pages. Implementations need not be safe for
/// concurrent use; the worker serializes every call.
pub trait RasterEngine: Send {
    fn page_count(&self) -> usize;

    /// Intrinsic page size in document units
    fn page_size(&self, page: usize) -> EngineResult<PageSize>;

    /// Prepare a page for rendering. Opening an already open page is a no-op.
    fn open_page(&mut self, page: usize) -> EngineResult<()>;

    /// Draw `page` into `bitmap`
    ///
    /// `rect` is where the whole page lands in bitmap pixels and may extend
    /// past the bitmap on any side. The bitmap arrives filled with the
    /// background color. `best_quality` selects the engine's slower print
    /// quality path where it has one.
    fn render_bitmap(
        &mut self,
        bitmap: &mut RgbaImage,
        page: usize,
        rect: PixelRect,
        annotations: bool,
        best_quality: bool,
        color_scheme: Option<&ColorScheme>,
    ) -> EngineResult<()>;

    /// Matches of `query` on `page`, in page units with a top-left origin
    fn search<'a>(
        &'a mut self,
        page: usize,
        query: &str,
        match_case: bool,
        whole_word: bool,
    ) -> EngineResult<Box<dyn Iterator<Item = PageRect> + 'a>>;

    fn count_characters(&mut self, page: usize) -> EngineResult<usize>;

    fn extract_characters(&mut self, page: usize, start: usize, length: usize)
        -> EngineResult<String>;

    fn metadata(&self) -> DocumentMeta;

    fn bookmarks(&self) -> Vec<Bookmark>;
}

/// Document-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// Outline entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    /// Document page the entry points at, if any
    pub page: Option<usize>,
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    pub fn new(title: impl Into<String>, page: Option<usize>) -> Self {
        Self {
            title: title.into(),
            page,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Bookmark>) -> Self {
        self.children = children;
        self
    }
}

/// RGBA color, written as `#rrggbb` or `#rrggbbaa` in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    /// Translucent yellow used for search matches
    pub const HIGHLIGHT: Color = Color::rgba(255, 235, 59, 128);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
                .ok_or_else(|| format!("invalid color: {}", s))
        };
        match hex.len() {
            6 => Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, 255)),
            8 => Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(format!("invalid color: {}", s)),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// Alternative page colors, e.g. for a night mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    /// Paper color, replaces white
    pub background: Color,
    /// Ink color, replaces black
    pub foreground: Color,
}

impl ColorScheme {
    pub fn new(background: Color, foreground: Color) -> Self {
        Self {
            background,
            foreground,
        }
    }

    /// Light text on a dark page
    pub fn night() -> Self {
        Self::new(Color::rgba(0x12, 0x12, 0x12, 255), Color::rgba(0xe0, 0xe0, 0xe0, 255))
    }

    /// Map a rendered pixel onto the scheme
    ///
    /// Luminance selects the mix between background (white) and foreground
    /// (black), so anti-aliased edges stay smooth.
    pub fn recolor(&self, pixel: Rgba<u8>) -> Rgba<u8> {
        let [r, g, b, a] = pixel.0;
        let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0;
        let mix = |bg: u8, fg: u8| (fg as f32 + (bg as f32 - fg as f32) * luma).round() as u8;
        Rgba([
            mix(self.background.r, self.foreground.r),
            mix(self.background.g, self.foreground.g),
            mix(self.background.b, self.foreground.b),
            a,
        ])
    }
}
