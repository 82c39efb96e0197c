//! Search match overlay
//!
//! Matches come from the engine in native page units. They are mapped into
//! the tile bitmap with the same transform the page itself was rendered
//! with. Small renders (thumbnails) clip in native units before scaling,
//! large renders scale first and clip in render space.

use crate::engine::Color;
use crate::geometry::{PageRect, PixelRect};
use image::RgbaImage;
use pageview_cache::RelativeBounds;
use pageview_layout::PageSize;

/// Where a slice of a page sits in its output bitmap
#[derive(Debug, Clone, Copy)]
pub struct SliceGeometry {
    /// Intrinsic page size
    pub native: PageSize,
    /// Whole-page placement from [`RenderBounds`](crate::RenderBounds)
    pub render: PixelRect,
    /// The slice of the page the bitmap shows
    pub slice: RelativeBounds,
    pub bitmap_width: u32,
    pub bitmap_height: u32,
}

impl SliceGeometry {
    fn is_downscaled(&self) -> bool {
        self.render.width() as f32 <= self.native.width
    }

    /// Bitmap region covered by one match, if it is visible in this slice
    pub fn map_match(&self, found: PageRect) -> Option<PixelRect> {
        if self.native.is_degenerate() || self.render.is_empty() {
            return None;
        }
        let (nw, nh) = (self.native.width, self.native.height);
        let (rw, rh) = (self.render.width() as f32, self.render.height() as f32);

        let mapped = if self.is_downscaled() {
            let slice = PageRect::from_relative(self.slice, nw, nh);
            found
                .intersect(&slice)?
                .scale(rw / nw, rh / nh)
                .translate(self.render.left as f32, self.render.top as f32)
        } else {
            let slice = PageRect::from_relative(self.slice, rw, rh);
            found
                .scale(rw / nw, rh / nh)
                .intersect(&slice)?
                .translate(-slice.left, -slice.top)
        };

        self.clamp(mapped)
    }

    fn clamp(&self, rect: PageRect) -> Option<PixelRect> {
        let (w, h) = (self.bitmap_width as f32, self.bitmap_height as f32);
        let pixels = PixelRect::new(
            rect.left.clamp(0.0, w).floor() as i32,
            rect.top.clamp(0.0, h).floor() as i32,
            rect.right.clamp(0.0, w).ceil() as i32,
            rect.bottom.clamp(0.0, h).ceil() as i32,
        );
        (!pixels.is_empty()).then_some(pixels)
    }
}

/// Paint every visible match and return the painted regions
pub fn overlay_matches(
    bitmap: &mut RgbaImage,
    matches: impl IntoIterator<Item = PageRect>,
    geometry: &SliceGeometry,
    color: Color,
) -> Vec<PixelRect> {
    let regions: Vec<PixelRect> = matches
        .into_iter()
        .filter_map(|found| geometry.map_match(found))
        .collect();

    for region in &regions {
        blend_rect(bitmap, *region, color);
    }
    regions
}

/// Alpha-blend `color` over a region already clamped to the bitmap
fn blend_rect(bitmap: &mut RgbaImage, region: PixelRect, color: Color) {
    let alpha = color.a as f32 / 255.0;
    let src = [color.r, color.g, color.b];

    for y in region.top..region.bottom {
        for x in region.left..region.right {
            let pixel = bitmap.get_pixel_mut(x as u32, y as u32);
            for (channel, value) in pixel.0.iter_mut().take(3).zip(src) {
                *channel = (value as f32 * alpha + *channel as f32 * (1.0 - alpha)).round() as u8;
            }
            pixel.0[3] = pixel.0[3].max(color.a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RenderBounds;
    use image::Rgba;

    fn geometry(native: PageSize, width: u32, height: u32, slice: RelativeBounds) -> SliceGeometry {
        SliceGeometry {
            native,
            render: RenderBounds::for_slice(width, height, slice),
            slice,
            bitmap_width: width,
            bitmap_height: height,
        }
    }

    #[test]
    fn test_tile_branch_maps_match() {
        // Whole page at 2x
        let geo = geometry(PageSize::new(612.0, 792.0), 1224, 1584, RelativeBounds::FULL);
        let region = geo.map_match(PageRect::new(100.0, 100.0, 160.0, 112.0));
        assert_eq!(region, Some(PixelRect::new(200, 200, 320, 224)));
    }

    #[test]
    fn test_tile_branch_translates_by_slice_origin() {
        // Right half of the page, 2x scale: page is 1224 wide, slice starts at 612
        let slice = RelativeBounds::new(0.5, 0.0, 1.0, 0.5);
        let geo = geometry(PageSize::new(612.0, 792.0), 612, 792, slice);
        let region = geo.map_match(PageRect::new(400.0, 10.0, 420.0, 20.0));
        assert_eq!(region, Some(PixelRect::new(188, 20, 228, 40)));

        // Left half is not part of this slice
        assert_eq!(geo.map_match(PageRect::new(10.0, 10.0, 20.0, 20.0)), None);
    }

    #[test]
    fn test_thumbnail_branch_maps_match() {
        // Thumbnail at 0.5x
        let geo = geometry(PageSize::new(600.0, 800.0), 300, 400, RelativeBounds::FULL);
        let region = geo.map_match(PageRect::new(100.0, 200.0, 160.0, 220.0));
        assert_eq!(region, Some(PixelRect::new(50, 100, 80, 110)));
    }

    #[test]
    fn test_match_clamped_to_bitmap() {
        let geo = geometry(PageSize::new(600.0, 800.0), 600, 800, RelativeBounds::FULL);
        let region = geo.map_match(PageRect::new(590.0, -5.0, 640.0, 10.0));
        assert_eq!(region, Some(PixelRect::new(590, 0, 600, 10)));
    }

    #[test]
    fn test_overlay_blends_only_matches() {
        let geo = geometry(PageSize::new(100.0, 100.0), 100, 100, RelativeBounds::FULL);
        let mut bitmap = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let regions = overlay_matches(
            &mut bitmap,
            vec![PageRect::new(10.0, 10.0, 20.0, 20.0)],
            &geo,
            Color::rgba(0, 0, 255, 255),
        );

        assert_eq!(regions.len(), 1);
        assert_eq!(*bitmap.get_pixel(15, 15), Rgba([0, 0, 255, 255]));
        assert_eq!(*bitmap.get_pixel(25, 25), Rgba([255, 255, 255, 255]));
    }
}
