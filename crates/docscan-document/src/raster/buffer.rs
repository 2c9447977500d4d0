// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster — the decoded image every pipeline stage reads from and produces.
// Wraps `image::DynamicImage`; decoding and encoding live here so the rest of
// the pipeline only ever sees pixels.

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use docscan_core::error::{DocScanError, Result};
use docscan_core::ImageSize;
use tracing::{debug, info, instrument};

/// A decoded image in luma, RGB or RGBA layout.
///
/// All operations are non-destructive: each method consumes `self` and
/// returns a new `Raster`, so a stage never mutates a buffer it handed on.
///
/// ```ignore
/// let preview = Raster::from_bytes(&jpeg)?
///     .downscale_to_fit(1024)
///     .grayscale();
/// ```
#[derive(Debug, Clone)]
pub struct Raster {
    image: DynamicImage,
}

impl Raster {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| DocScanError::DecodeFailure(err.to_string()))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let raster = Self::from_bytes(&data)?;
        info!(
            width = raster.width(),
            height = raster.height(),
            "Image loaded"
        );
        Ok(raster)
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    /// Number of colour channels in the underlying layout.
    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Shrink so the longer side is at most `max_side`, preserving aspect
    /// ratio. Images already within bounds are returned untouched.
    ///
    /// Uses triangle (bilinear) filtering, which is deterministic and cheap
    /// enough for detection previews.
    #[instrument(skip(self), fields(max_side))]
    pub fn downscale_to_fit(self, max_side: u32) -> Self {
        let (w, h) = (self.width(), self.height());
        let longest = w.max(h);
        if longest <= max_side || longest == 0 {
            return self;
        }
        let ratio = max_side as f64 / longest as f64;
        let new_w = ((w as f64 * ratio).round() as u32).max(1);
        let new_h = ((h as f64 * ratio).round() as u32).max(1);
        debug!(from_w = w, from_h = h, new_w, new_h, "Downscaling");
        Self {
            image: self
                .image
                .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle),
        }
    }

    /// Convert to single-channel luma.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Adjust contrast by a factor around mid-grey. Values > 1.0 increase
    /// contrast; 1.0 is a no-op. Luma images stay luma; everything else is
    /// processed as RGBA.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let adjust = |channel: u8| -> u8 {
            let val = factor * (channel as f32 - 128.0) + 128.0;
            val.round().clamp(0.0, 255.0) as u8
        };

        let image = match self.image {
            DynamicImage::ImageLuma8(gray) => {
                let out = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                    Luma([adjust(gray.get_pixel(x, y).0[0])])
                });
                DynamicImage::ImageLuma8(out)
            }
            other => {
                let rgba = other.to_rgba8();
                let out = image::ImageBuffer::from_fn(rgba.width(), rgba.height(), |x, y| {
                    let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
                    image::Rgba([adjust(r), adjust(g), adjust(b), a])
                });
                DynamicImage::ImageRgba8(out)
            }
        };
        Self { image }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| DocScanError::EncodeFailure(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

impl From<DynamicImage> for Raster {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| DocScanError::EncodeFailure(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
