//! PDFium-backed engine
//!
//! Available with the `pdfium` feature. The PDFium library is looked up next
//! to the executable, then in the working directory, then in the system
//! library paths.

use crate::engine::{Bookmark, ColorScheme, DocumentMeta, RasterEngine};
use crate::error::{EngineError, EngineResult};
use crate::geometry::{PageRect, PixelRect};
use image::{Rgba, RgbaImage};
use pageview_layout::PageSize;
use pdfium_render::prelude::*;
use std::path::Path;

/// Whole-page renders larger than this are refused
const MAX_PAGE_PIXELS: i64 = 16384 * 16384;

const MAX_OUTLINE_DEPTH: usize = 64;
const MAX_OUTLINE_ENTRIES: usize = 10_000;

/// Rasterization engine over one PDF document
pub struct PdfiumEngine {
    document: PdfDocument<'static>,
    sizes: Vec<PageSize>,
}

impl PdfiumEngine {
    fn bind() -> EngineResult<Pdfium> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()));

        if let Some(ref dir) = exe_dir {
            if let Ok(bindings) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            {
                return Ok(Pdfium::new(bindings));
            }
        }

        Ok(Pdfium::new(
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| EngineError::Backend(format!("cannot bind PDFium: {}", e)))?,
        ))
    }

    /// Open a PDF file
    pub fn open<P: AsRef<Path>>(path: P, password: Option<&str>) -> EngineResult<Self> {
        let pdfium = Box::leak(Box::new(Self::bind()?));
        let document = pdfium
            .load_pdf_from_file(path.as_ref(), password)
            .map_err(|e| EngineError::Backend(e.to_string()))?;
        Self::from_document(document)
    }

    /// Open a PDF held in memory
    pub fn from_bytes(data: Vec<u8>, password: Option<&str>) -> EngineResult<Self> {
        let pdfium = Box::leak(Box::new(Self::bind()?));
        let data: &'static [u8] = Box::leak(data.into_boxed_slice());
        let document = pdfium
            .load_pdf_from_byte_slice(data, password)
            .map_err(|e| EngineError::Backend(e.to_string()))?;
        Self::from_document(document)
    }

    fn from_document(document: PdfDocument<'static>) -> EngineResult<Self> {
        let sizes = document
            .pages()
            .iter()
            .map(|page| PageSize::new(page.width().value, page.height().value))
            .collect::<Vec<_>>();
        log::info!("opened PDF with {} page(s)", sizes.len());
        Ok(Self { document, sizes })
    }

    fn page(&self, page: usize) -> EngineResult<PdfPage<'_>> {
        let index = u16::try_from(page).map_err(|_| EngineError::InvalidPage(page))?;
        self.document
            .pages()
            .get(index)
            .map_err(|_| EngineError::InvalidPage(page))
    }

    fn page_text(&self, page: usize) -> EngineResult<String> {
        let text = self
            .page(page)?
            .text()
            .map_err(|e| EngineError::Render {
                page,
                reason: format!("failed to extract text: {}", e),
            })?
            .all();
        Ok(text)
    }

    /// Characters of a page with loose bounds, top-left origin
    fn positioned_chars(&self, page: usize) -> EngineResult<Vec<(char, PageRect)>> {
        let pdf_page = self.page(page)?;
        let page_height = pdf_page.height().value;
        let text = pdf_page.text().map_err(|e| EngineError::Render {
            page,
            reason: format!("failed to get text page: {}", e),
        })?;

        let mut chars = Vec::new();
        for char_result in text.chars().iter() {
            let Some(c) = char_result.unicode_char() else {
                continue;
            };
            let Ok(bounds) = char_result.loose_bounds() else {
                continue;
            };
            chars.push((
                c,
                PageRect::new(
                    bounds.left().value,
                    page_height - bounds.top().value,
                    bounds.right().value,
                    page_height - bounds.bottom().value,
                ),
            ));
        }
        Ok(chars)
    }
}

impl RasterEngine for PdfiumEngine {
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
        self.page(page).map(|_| ()).map_err(|_| EngineError::PageOpen {
            page,
            reason: "PDFium could not load the page".to_string(),
        })
    }

    fn render_bitmap(
        &mut self,
        bitmap: &mut RgbaImage,
        page: usize,
        rect: PixelRect,
        annotations: bool,
        best_quality: bool,
        color_scheme: Option<&ColorScheme>,
    ) -> EngineResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        if i64::from(rect.width()) * i64::from(rect.height()) > MAX_PAGE_PIXELS {
            return Err(EngineError::Allocation {
                page,
                width: rect.width() as u32,
                height: rect.height() as u32,
            });
        }

        let config = PdfRenderConfig::new()
            .set_target_width(rect.width())
            .set_target_height(rect.height())
            .render_form_data(annotations)
            .use_print_quality(best_quality);

        let rendered = self
            .page(page)?
            .render_with_config(&config)
            .map_err(|e| EngineError::Render {
                page,
                reason: e.to_string(),
            })?;
        let source = rendered.as_rgba_bytes();
        let source_width = rendered.width().max(0) as i32;

        // Copy the part of the page that falls on the bitmap
        let (width, height) = (bitmap.width() as i32, bitmap.height() as i32);
        for y in rect.top.max(0)..rect.bottom.min(height) {
            for x in rect.left.max(0)..rect.right.min(width) {
                let (sx, sy) = (x - rect.left, y - rect.top);
                if sx >= source_width {
                    continue;
                }
                let index = ((sy * source_width + sx) * 4) as usize;
                let Some(px) = source.get(index..index + 4) else {
                    continue;
                };
                let pixel = Rgba([px[0], px[1], px[2], px[3]]);
                let pixel = match color_scheme {
                    Some(scheme) => scheme.recolor(pixel),
                    None => pixel,
                };
                bitmap.put_pixel(x as u32, y as u32, pixel);
            }
        }
        Ok(())
    }

    fn search<'a>(
        &'a mut self,
        page: usize,
        query: &str,
        match_case: bool,
        whole_word: bool,
    ) -> EngineResult<Box<dyn Iterator<Item = PageRect> + 'a>> {
        let chars = self.positioned_chars(page)?;
        let fold = |c: char| {
            if match_case {
                c
            } else {
                c.to_lowercase().next().unwrap_or(c)
            }
        };
        let needle: Vec<char> = query.chars().map(fold).collect();
        if needle.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }

        let is_word = |i: usize| chars.get(i).is_some_and(|(c, _)| c.is_alphanumeric());
        let mut found = Vec::new();
        let mut start = 0;
        while start + needle.len() <= chars.len() {
            let end = start + needle.len();
            let hit = chars[start..end]
                .iter()
                .zip(&needle)
                .all(|((c, _), n)| fold(*c) == *n);
            let bounded = !whole_word
                || ((start == 0 || !is_word(start - 1)) && !is_word(end));
            if hit && bounded {
                let rect = chars[start..end]
                    .iter()
                    .map(|(_, r)| *r)
                    .reduce(|a, b| {
                        PageRect::new(
                            a.left.min(b.left),
                            a.top.min(b.top),
                            a.right.max(b.right),
                            a.bottom.max(b.bottom),
                        )
                    });
                found.extend(rect);
                start = end;
            } else {
                start += 1;
            }
        }
        Ok(Box::new(found.into_iter()))
    }

    fn count_characters(&mut self, page: usize) -> EngineResult<usize> {
        Ok(self.page_text(page)?.chars().count())
    }

    fn extract_characters(
        &mut self,
        page: usize,
        start: usize,
        length: usize,
    ) -> EngineResult<String> {
        Ok(self.page_text(page)?.chars().skip(start).take(length).collect())
    }

    fn metadata(&self) -> DocumentMeta {
        let meta = self.document.metadata();
        let tag = |tag| meta.get(tag).map(|v| v.value().to_string());

        DocumentMeta {
            title: tag(PdfDocumentMetadataTagType::Title),
            author: tag(PdfDocumentMetadataTagType::Author),
            subject: tag(PdfDocumentMetadataTagType::Subject),
            keywords: tag(PdfDocumentMetadataTagType::Keywords),
            creator: tag(PdfDocumentMetadataTagType::Creator),
            producer: tag(PdfDocumentMetadataTagType::Producer),
            creation_date: tag(PdfDocumentMetadataTagType::CreationDate),
            modification_date: tag(PdfDocumentMetadataTagType::ModificationDate),
        }
    }

    /// Outline tree, children nested under their parent entry
    fn bookmarks(&self) -> Vec<Bookmark> {
        let mut budget = MAX_OUTLINE_ENTRIES;
        outline_level(self.document.bookmarks().root(), 0, &mut budget)
    }
}

/// Walk one outline level starting at `first`, descending into children.
/// Malformed files can link entries into a cycle, so both the depth and the
/// total number of entries are bounded.
fn outline_level(
    first: Option<PdfBookmark<'_>>,
    depth: usize,
    budget: &mut usize,
) -> Vec<Bookmark> {
    let mut entries = Vec::new();
    if depth >= MAX_OUTLINE_DEPTH {
        return entries;
    }
    let mut next = first;
    while let Some(bookmark) = next {
        if *budget == 0 {
            break;
        }
        *budget -= 1;
        let page = bookmark
            .destination()
            .and_then(|dest| dest.page_index().ok())
            .map(usize::from);
        let children = outline_level(bookmark.first_child(), depth + 1, budget);
        entries.push(
            Bookmark::new(bookmark.title().unwrap_or_default(), page).with_children(children),
        );
        next = bookmark.next_sibling();
    }
    entries
}
