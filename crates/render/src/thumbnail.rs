//! Page thumbnail rendering
//!
//! Renders a single page scaled to fit inside a fixed target box, preserving
//! the page's aspect ratio. This is the render backend the thumbnail
//! pipeline drives; it is synchronous and expected to be called off the
//! coordinating context.

use crate::pdf::{PdfDocument, PdfResult};

/// Target bounding box for thumbnail rendering, in pixels.
///
/// The rendered image fits within this box; it matches the box only on the
/// page's longer axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailTarget {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailTarget {
    /// Default thumbnail box used by the page grid.
    pub const DEFAULT: ThumbnailTarget = ThumbnailTarget {
        width: 140,
        height: 180,
    };

    /// Create a target box. Zero dimensions are clamped to 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl Default for ThumbnailTarget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compute the pixel size of a page scaled to fit a target box.
///
/// Preserves aspect ratio, scaling up or down so the page touches the box
/// on its binding axis. Degenerate page geometry collapses to 1x1.
pub fn fit_within(page_width: f32, page_height: f32, target: ThumbnailTarget) -> (u32, u32) {
    if page_width <= 0.0 || page_height <= 0.0 {
        return (1, 1);
    }

    let scale_x = target.width as f32 / page_width;
    let scale_y = target.height as f32 / page_height;
    let scale = scale_x.min(scale_y);

    let width = (page_width * scale).round() as u32;
    let height = (page_height * scale).round() as u32;

    (width.max(1), height.max(1))
}

/// A rendered page thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Pixel data in RGBA format (4 bytes per pixel)
    pub pixels: Vec<u8>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl Thumbnail {
    /// Get the size of the pixel data in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}

/// A document that can enumerate and rasterize its pages.
///
/// This is the seam between the page collection and the render backend:
/// entries carry their source as a trait object, the pipeline renders
/// through it, and tests substitute instrumented implementations. The
/// backend is treated as deterministic for a given page and target size.
pub trait PageSource: Send + Sync {
    /// Number of pages in the source.
    fn page_count(&self) -> u16;

    /// Render one page scaled to fit `target`, preserving aspect ratio.
    ///
    /// Expensive (tens of milliseconds for a real backend); never called on
    /// the coordinating context.
    fn render_thumbnail(&self, page_index: u16, target: ThumbnailTarget) -> PdfResult<Thumbnail>;
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> u16 {
        PdfDocument::page_count(self)
    }

    fn render_thumbnail(&self, page_index: u16, target: ThumbnailTarget) -> PdfResult<Thumbnail> {
        let (page_width, page_height) = self.page_size(page_index)?;
        let (width, height) = fit_within(page_width, page_height, target);

        let pixels = self.render_page_rgba(page_index, width, height)?;

        Ok(Thumbnail {
            pixels,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_portrait_page() {
        // US Letter portrait: 612x792 points into a 140x180 box.
        // Height binds: 180/792 < 140/612.
        let (w, h) = fit_within(612.0, 792.0, ThumbnailTarget::DEFAULT);
        assert_eq!(h, 180);
        assert!(w < 140);
        // Aspect preserved within rounding
        let aspect = w as f32 / h as f32;
        assert!((aspect - 612.0 / 792.0).abs() < 0.02);
    }

    #[test]
    fn test_fit_within_landscape_page() {
        let (w, h) = fit_within(792.0, 612.0, ThumbnailTarget::DEFAULT);
        assert_eq!(w, 140);
        assert!(h < 180);
    }

    #[test]
    fn test_fit_within_exact_fit() {
        let (w, h) = fit_within(140.0, 180.0, ThumbnailTarget::DEFAULT);
        assert_eq!((w, h), (140, 180));
    }

    #[test]
    fn test_fit_within_scales_up_small_pages() {
        let (w, h) = fit_within(14.0, 18.0, ThumbnailTarget::DEFAULT);
        assert_eq!((w, h), (140, 180));
    }

    #[test]
    fn test_fit_within_degenerate_page() {
        assert_eq!(fit_within(0.0, 792.0, ThumbnailTarget::DEFAULT), (1, 1));
        assert_eq!(fit_within(612.0, -1.0, ThumbnailTarget::DEFAULT), (1, 1));
    }

    #[test]
    fn test_target_clamps_zero() {
        let target = ThumbnailTarget::new(0, 0);
        assert_eq!((target.width, target.height), (1, 1));
    }

    #[test]
    fn test_thumbnail_byte_size() {
        let thumb = Thumbnail {
            pixels: vec![0u8; 140 * 180 * 4],
            width: 140,
            height: 180,
        };
        assert_eq!(thumb.byte_size(), 140 * 180 * 4);
    }
}
