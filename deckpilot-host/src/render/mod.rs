//! Slide rasterisation
//!
//! A [`SlideConverter`] knows how to count a deck's pages and turn one page
//! into an RGB raster. Conversion is always per page; decks are never
//! rasterised eagerly.

pub mod office;

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::ConvertError;

pub use office::OfficeConverter;

/// Supported deck formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckFormat {
    Pptx,
    Pdf,
}

impl DeckFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pptx" => Some(DeckFormat::Pptx),
            "pdf" => Some(DeckFormat::Pdf),
            _ => None,
        }
    }
}

/// Target raster size
///
/// Pages are scaled to `width`, keeping their aspect ratio; the display
/// surface letterboxes them into `width` x `height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

/// 8-bit RGB raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideImage(RgbImage);

impl SlideImage {
    /// Solid-color image
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Size of the pixel buffer, used for the cache byte ceiling
    pub fn byte_size(&self) -> usize {
        self.0.as_raw().len()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.0.get_pixel(x, y).0
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.0
    }

    pub fn into_rgb(self) -> RgbImage {
        self.0
    }
}

impl From<RgbImage> for SlideImage {
    fn from(image: RgbImage) -> Self {
        Self(image)
    }
}

/// Decode an encoded raster (PNG from `pdftoppm -png`) into RGB
pub fn decode(bytes: &[u8]) -> Result<SlideImage, ConvertError> {
    let image = image::load_from_memory(bytes)?;
    Ok(SlideImage(image.into_rgb8()))
}

/// Page counting and rasterisation for deck files
pub trait SlideConverter: Send + Sync {
    /// Number of pages (slides) in the deck
    fn page_count(&self, source: &Path, format: DeckFormat) -> Result<usize, ConvertError>;

    /// Rasterise one zero-based page
    fn render_page(
        &self,
        source: &Path,
        format: DeckFormat,
        page: usize,
        size: RenderSize,
    ) -> Result<SlideImage, ConvertError>;
}
