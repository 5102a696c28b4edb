//! Image decoding seam.

use crate::lrf::ImageEncoding;
use crate::util::extract_image_dimensions;

/// A decoded image. `pixels` is RGBA, row-major, and may be empty when only
/// the dimensions were read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub fn has_pixels(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * 4 && !self.pixels.is_empty()
    }
}

/// Turns stored image bytes into pixels.
pub trait ImageDecoder: Send + Sync {
    /// `None` when the bytes cannot be decoded.
    fn decode(&self, bytes: &[u8], encoding: ImageEncoding) -> Option<RasterImage>;
}

/// Reads dimensions from JPEG, PNG, GIF and BMP headers without decoding
/// pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderProbe;

impl ImageDecoder for HeaderProbe {
    fn decode(&self, bytes: &[u8], encoding: ImageEncoding) -> Option<RasterImage> {
        if let ImageEncoding::Unknown(code) = encoding
            && ImageEncoding::sniff(bytes) == ImageEncoding::Unknown(0)
        {
            tracing::debug!(code, "unrecognised image encoding");
            return None;
        }
        let (width, height) = extract_image_dimensions(bytes)?;
        Some(RasterImage {
            width,
            height,
            pixels: Vec::new(),
        })
    }
}
