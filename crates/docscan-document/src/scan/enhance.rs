// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline — contrast boosting, sharpening, binarization and
// speck cleanup for rectified document images.

use docscan_core::config::{EnhanceConfig, EnhanceMode};
use image::DynamicImage;
use imageproc::distance_transform::Norm;
use imageproc::filter::sharpen3x3;
use imageproc::morphology::close;
use tracing::{debug, info, instrument};

use super::threshold::{Polarity, adaptive_threshold, otsu_binarize};
use crate::raster::Raster;

/// Enhances rectified document images for legible output.
///
/// Provides the post-processing steps commonly needed after flattening a
/// photographed page: grayscale conversion, contrast enhancement, sharpening,
/// adaptive binarization and removal of isolated dark specks. Every step is
/// deterministic.
pub struct ScanEnhancer {
    /// The working image (kept as `DynamicImage` for flexibility).
    image: DynamicImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Tone -----------------------------------------------------------------

    /// Grayscale, then stretch contrast around mid-grey by `factor`.
    #[instrument(skip(self), fields(factor))]
    pub fn contrast(self, factor: f32) -> Self {
        let image = Raster::from_dynamic(self.image)
            .grayscale()
            .adjust_contrast(factor)
            .into_dynamic();
        Self { image }
    }

    /// Apply a 3x3 sharpening kernel to the luma channel.
    #[instrument(skip(self))]
    pub fn sharpen(self) -> Self {
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(sharpen3x3(&gray)),
        }
    }

    // -- Binarization ---------------------------------------------------------

    /// Apply adaptive thresholding to produce a black-and-white image.
    ///
    /// Uses a local mean approach: for each pixel, the threshold is the mean
    /// intensity within a `block_radius` neighbourhood, minus `offset`.
    /// Pixels darker than the local threshold become black; others become
    /// white.
    ///
    /// A typical `block_radius` is 15 and `offset` is 10.
    #[instrument(skip(self), fields(block_radius, offset))]
    pub fn binarize(self, block_radius: u32, offset: i32) -> Self {
        let gray = self.image.to_luma8();
        let binary = adaptive_threshold(&gray, block_radius, offset, Polarity::Normal);
        debug!("Binarization complete");
        Self {
            image: DynamicImage::ImageLuma8(binary),
        }
    }

    /// Global binarization with the threshold picked by Otsu's method.
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let gray = self.image.to_luma8();
        let (level, binary) = otsu_binarize(&gray);
        debug!(level, "Otsu level computed");
        Self {
            image: DynamicImage::ImageLuma8(binary),
        }
    }

    /// Morphological close of the white background, which fills dark specks
    /// narrower than the structuring element.
    #[instrument(skip(self), fields(radius))]
    pub fn close(self, radius: u8) -> Self {
        if radius == 0 {
            return self;
        }
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(close(&gray, Norm::LInf, radius)),
        }
    }

    // -- Enhancement pipeline -------------------------------------------------

    /// Run the steps selected by `config.mode`:
    ///
    /// - `None`: unchanged
    /// - `Contrast`: grayscale and contrast stretch
    /// - `Sharpen`: `Contrast`, then a 3x3 sharpen
    /// - `Document`: `Contrast`, adaptive binarization, then close
    /// - `Otsu`: `Contrast`, global Otsu binarization, then close
    #[instrument(skip_all, fields(mode = ?config.mode))]
    pub fn apply(self, config: &EnhanceConfig) -> Self {
        info!("Running scan enhancement");
        match config.mode {
            EnhanceMode::None => self,
            EnhanceMode::Contrast => self.contrast(config.contrast_factor),
            EnhanceMode::Sharpen => self.contrast(config.contrast_factor).sharpen(),
            EnhanceMode::Document => self
                .contrast(config.contrast_factor)
                .binarize(config.block_radius, config.offset)
                .close(config.close_radius),
            EnhanceMode::Otsu => self
                .contrast(config.contrast_factor)
                .binarize_otsu()
                .close(config.close_radius),
        }
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    /// White page with a dark text-like bar and a single-pixel speck.
    fn page() -> DynamicImage {
        let mut img = RgbImage::from_pixel(60, 40, Rgb([235, 230, 225]));
        for y in 18..24 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgb([20, 20, 30]));
            }
        }
        img.put_pixel(5, 5, Rgb([60, 60, 60]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn none_mode_is_untouched() {
        let config = EnhanceConfig {
            mode: EnhanceMode::None,
            ..EnhanceConfig::default()
        };
        let out = ScanEnhancer::from_dynamic(page()).apply(&config).into_dynamic();
        assert_eq!(out, page());
    }

    #[test]
    fn contrast_mode_is_grayscale() {
        let config = EnhanceConfig {
            mode: EnhanceMode::Contrast,
            ..EnhanceConfig::default()
        };
        let out = ScanEnhancer::from_dynamic(page()).apply(&config).into_dynamic();
        let luma = out.as_luma8().expect("grayscale output");
        assert!(luma.get_pixel(30, 20).0[0] < luma.get_pixel(30, 5).0[0]);
    }

    #[test]
    fn document_mode_is_binary_and_keeps_ink() {
        let out = ScanEnhancer::from_dynamic(page())
            .apply(&EnhanceConfig::default())
            .into_dynamic();
        let luma = out.as_luma8().expect("binary luma");
        assert!(luma.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(luma.get_pixel(30, 20).0[0], 0);
        assert_eq!(luma.get_pixel(30, 5).0[0], 255);
        // The isolated speck is closed over.
        assert_eq!(luma.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn otsu_separates_two_tones() {
        let img = GrayImage::from_fn(20, 10, |x, _| Luma([if x < 10 { 40 } else { 210 }]));
        let out = ScanEnhancer::from_dynamic(DynamicImage::ImageLuma8(img))
            .binarize_otsu()
            .into_dynamic();
        let luma = out.as_luma8().expect("luma");
        assert_eq!(luma.get_pixel(2, 2).0[0], 0);
        assert_eq!(luma.get_pixel(15, 2).0[0], 255);
    }

    #[test]
    fn otsu_mode_is_binary_and_keeps_ink() {
        let config = EnhanceConfig {
            mode: EnhanceMode::Otsu,
            ..EnhanceConfig::default()
        };
        let out = ScanEnhancer::from_dynamic(page()).apply(&config).into_dynamic();
        let luma = out.as_luma8().expect("binary luma");
        assert!(luma.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(luma.get_pixel(30, 20).0[0], 0);
        assert_eq!(luma.get_pixel(30, 5).0[0], 255);
        assert_eq!(luma.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn sharpen_keeps_dimensions() {
        let out = ScanEnhancer::from_dynamic(page()).sharpen().into_dynamic();
        assert_eq!((out.width(), out.height()), (60, 40));
    }

    #[test]
    fn enhancement_is_deterministic() {
        let a = ScanEnhancer::from_dynamic(page())
            .apply(&EnhanceConfig::default())
            .into_dynamic();
        let b = ScanEnhancer::from_dynamic(page())
            .apply(&EnhanceConfig::default())
            .into_dynamic();
        assert_eq!(a, b);
    }
}
