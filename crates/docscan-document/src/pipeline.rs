// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DocumentScanner — composes edge extraction, detection, homography, warp and
// enhancement into the four public operations, and owns the fallback policy.

use docscan_core::error::{DocScanError, Result};
use docscan_core::{
    CornerSource, DetectionPreview, ImageSize, Point2D, PreviewSize, Quadrilateral, ScanConfig,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::raster::Raster;
use crate::scan::{QuadDetector, ScanEnhancer, extract_edges, plan_rectification, warp};

/// Corner slack, in pixels, allowed outside the image frame for
/// caller-supplied corners.
const CORNER_TOLERANCE: f64 = 0.5;

/// JPEG quality of the preview image returned with a detection.
const PREVIEW_JPEG_QUALITY: u8 = 95;

/// A rectified (and possibly enhanced) document.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub image: DynamicImage,
    /// The quadrilateral that was rectified, in source pixel coordinates.
    pub quad: Quadrilateral,
    pub source: CornerSource,
}

impl ScanResult {
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.image.width(), self.image.height())
    }

    /// Wrap the output image for encoding.
    pub fn into_raster(self) -> Raster {
        Raster::from_dynamic(self.image)
    }
}

/// Stateless document scanner.
///
/// Holds only an immutable [`ScanConfig`]; every operation takes `&self`, so
/// one scanner can be cloned or shared freely across threads.
///
/// ```ignore
/// let scanner = DocumentScanner::new(ScanConfig::default())?;
/// let result = scanner.scan_document(&photo)?;
/// let png = result.into_raster().to_png_bytes()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentScanner {
    config: ScanConfig,
    detector: QuadDetector,
}

impl DocumentScanner {
    // -- Construction ---------------------------------------------------------

    /// Build a scanner, rejecting invalid configuration.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let detector = QuadDetector::new(config.detector.clone());
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    // -- Operations -----------------------------------------------------------

    /// Locate the document outline. Fails with `NotFound` rather than
    /// guessing.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect_document(&self, image: &DynamicImage) -> Result<Quadrilateral> {
        let (quad, _) = self.locate(image, false)?;
        Ok(quad)
    }

    /// Like [`detect_document`](Self::detect_document), but reports the
    /// detection preview scale alongside the corners, plus the preview itself
    /// as a base64 JPEG.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect_document_preview(&self, image: &DynamicImage) -> Result<DetectionPreview> {
        let (_, preview) = self.locate(image, true)?;
        Ok(preview)
    }

    /// Detect, rectify, and enhance. Falls back to the whole frame when no
    /// document is found.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn scan_document(&self, image: &DynamicImage) -> Result<ScanResult> {
        let (quad, source) = match self.locate(image, false) {
            Ok((quad, _)) => (quad, CornerSource::Detected),
            Err(DocScanError::NotFound) => {
                warn!("No document found; scanning the full frame");
                (Quadrilateral::full_frame(size_of(image)), CornerSource::FullFrameFallback)
            }
            Err(err) => return Err(err),
        };
        let rectified = self.rectify(image, &quad)?;
        let enhanced = self.enhance(rectified);
        info!(
            out_w = enhanced.width(),
            out_h = enhanced.height(),
            source = ?source,
            "Document scanned"
        );
        Ok(ScanResult {
            image: enhanced,
            quad,
            source,
        })
    }

    /// Rectify and enhance using caller-supplied corners.
    ///
    /// `corners` must hold exactly four finite points inside the image
    /// (half a pixel of slack); their order does not matter.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), corners = corners.len()))]
    pub fn process_with_corners(
        &self,
        image: &DynamicImage,
        corners: &[Point2D],
    ) -> Result<ScanResult> {
        let quad = self.caller_quad(image, corners)?;
        let rectified = self.rectify(image, &quad)?;
        let enhanced = self.enhance(rectified);
        info!(
            out_w = enhanced.width(),
            out_h = enhanced.height(),
            "Corners processed"
        );
        Ok(ScanResult {
            image: enhanced,
            quad,
            source: CornerSource::Caller,
        })
    }

    /// Rectify using caller-supplied corners, without enhancement.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), corners = corners.len()))]
    pub fn crop_document(&self, image: &DynamicImage, corners: &[Point2D]) -> Result<ScanResult> {
        let quad = self.caller_quad(image, corners)?;
        let cropped = self.rectify(image, &quad)?;
        info!(
            out_w = cropped.width(),
            out_h = cropped.height(),
            "Document cropped"
        );
        Ok(ScanResult {
            image: cropped,
            quad,
            source: CornerSource::Caller,
        })
    }

    /// Warp `quad` onto an upright rectangle sized from its edge lengths.
    pub fn rectify(&self, image: &DynamicImage, quad: &Quadrilateral) -> Result<DynamicImage> {
        ensure_not_empty(image)?;
        let (homography, size) = plan_rectification(quad, self.config.warp.min_output_side)?;
        warp(image, &homography, size, self.config.warp.background)
    }

    // -- Encoded input --------------------------------------------------------

    pub fn detect_document_bytes(&self, data: &[u8]) -> Result<DetectionPreview> {
        let image = Raster::from_bytes(data)?.into_dynamic();
        self.detect_document_preview(&image)
    }

    pub fn scan_document_bytes(&self, data: &[u8]) -> Result<ScanResult> {
        let image = Raster::from_bytes(data)?.into_dynamic();
        self.scan_document(&image)
    }

    pub fn process_with_corners_bytes(&self, data: &[u8], corners: &[Point2D]) -> Result<ScanResult> {
        let image = Raster::from_bytes(data)?.into_dynamic();
        self.process_with_corners(&image, corners)
    }

    pub fn crop_document_bytes(&self, data: &[u8], corners: &[Point2D]) -> Result<ScanResult> {
        let image = Raster::from_bytes(data)?.into_dynamic();
        self.crop_document(&image, corners)
    }

    // -- Internals ------------------------------------------------------------

    /// Run detection on a bounded-size preview and map the result back to
    /// full resolution. `with_image` attaches the encoded preview.
    fn locate(
        &self,
        image: &DynamicImage,
        with_image: bool,
    ) -> Result<(Quadrilateral, DetectionPreview)> {
        ensure_not_empty(image)?;
        let full = size_of(image);

        let downscaled;
        let preview: &DynamicImage = match self.config.detector.detection_max_side {
            Some(max_side) if full.width.max(full.height) > max_side => {
                downscaled = Raster::from_dynamic(image.clone())
                    .downscale_to_fit(max_side)
                    .into_dynamic();
                &downscaled
            }
            _ => image,
        };
        let preview_size = size_of(preview);

        let edges = extract_edges(preview, &self.config.edges);
        let found = self.detector.detect(&edges)?;

        let sx = full.width as f64 / preview_size.width as f64;
        let sy = full.height as f64 / preview_size.height as f64;
        let quad = found.scaled_xy(sx, sy).clamped_to(full);

        info!(
            preview_w = preview_size.width,
            preview_h = preview_size.height,
            area = quad.area(),
            "Document detected"
        );
        let encoded = if with_image {
            Some(encode_preview(preview)?)
        } else {
            None
        };
        let preview = DetectionPreview {
            corners: quad.to_pairs(),
            ratio: preview_size.width as f64 / full.width as f64,
            preview_size: PreviewSize {
                width: preview_size.width,
                height: preview_size.height,
            },
            image: encoded,
        };
        Ok((quad, preview))
    }

    fn caller_quad(&self, image: &DynamicImage, corners: &[Point2D]) -> Result<Quadrilateral> {
        ensure_not_empty(image)?;
        let quad = Quadrilateral::from_corner_list(corners)?;
        let size = size_of(image);
        if !quad.fits_within(size, CORNER_TOLERANCE) {
            return Err(DocScanError::invalid(format!(
                "corners {:?} fall outside the {}x{} image",
                quad.to_pairs(),
                size.width,
                size.height
            )));
        }
        Ok(quad)
    }

    fn enhance(&self, image: DynamicImage) -> DynamicImage {
        ScanEnhancer::from_dynamic(image)
            .apply(&self.config.enhance)
            .into_dynamic()
    }
}

fn encode_preview(preview: &DynamicImage) -> Result<String> {
    let jpeg = Raster::from_dynamic(preview.clone()).to_jpeg_bytes(PREVIEW_JPEG_QUALITY)?;
    debug!(jpeg_bytes = jpeg.len(), "Preview encoded");
    Ok(STANDARD.encode(jpeg))
}

fn size_of(image: &DynamicImage) -> ImageSize {
    ImageSize::new(image.width(), image.height())
}

fn ensure_not_empty(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DocScanError::invalid(format!(
            "image is empty ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn geometry_scanner() -> DocumentScanner {
        DocumentScanner::new(ScanConfig::geometry_only()).expect("valid config")
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ScanConfig::default();
        config.warp.min_output_side = 0;
        assert!(DocumentScanner::new(config).is_err());
    }

    #[test]
    fn empty_image_is_invalid_input() {
        let empty = DynamicImage::new_luma8(0, 0);
        let scanner = geometry_scanner();
        assert!(matches!(
            scanner.detect_document(&empty),
            Err(DocScanError::InvalidInput(_))
        ));
        assert!(matches!(
            scanner.scan_document(&empty),
            Err(DocScanError::InvalidInput(_))
        ));
    }

    #[test]
    fn corners_must_lie_inside_the_image() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 50, Luma([128])));
        let corners = [
            Point2D::new(0.0, 0.0),
            Point2D::new(80.0, 0.0),
            Point2D::new(80.0, 50.0),
            Point2D::new(0.0, 50.0),
        ];
        let err = geometry_scanner().crop_document(&img, &corners).unwrap_err();
        assert!(matches!(err, DocScanError::InvalidInput(_)));
    }

    #[test]
    fn three_corners_are_invalid_input() {
        let img = DynamicImage::new_rgb8(20, 20);
        let corners = [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
        ];
        let err = geometry_scanner()
            .process_with_corners(&img, &corners)
            .unwrap_err();
        assert!(matches!(err, DocScanError::InvalidInput(_)));
    }

    #[test]
    fn crop_skips_enhancement() {
        let img = DynamicImage::new_rgb8(30, 20);
        let frame = Quadrilateral::full_frame(ImageSize::new(30, 20));
        let scanner = DocumentScanner::new(ScanConfig::default()).expect("valid");
        let cropped = scanner
            .crop_document(&img, frame.corners())
            .expect("crop");
        assert!(cropped.image.as_rgb8().is_some());
        assert_eq!(cropped.source, CornerSource::Caller);

        let processed = scanner
            .process_with_corners(&img, frame.corners())
            .expect("process");
        assert!(processed.image.as_luma8().is_some());
    }

    #[test]
    fn detection_preview_carries_a_jpeg() {
        let mut img = GrayImage::from_pixel(200, 160, Luma([30]));
        for y in 30..130 {
            for x in 40..160 {
                img.put_pixel(x, y, Luma([240]));
            }
        }
        let img = DynamicImage::ImageLuma8(img);
        let scanner = geometry_scanner();

        let preview = scanner.detect_document_preview(&img).expect("found");
        let encoded = preview.image.as_deref().expect("preview image");
        let jpeg = STANDARD.decode(encoded).expect("valid base64");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).expect("decodable");
        assert_eq!((decoded.width(), decoded.height()), (200, 160));
    }

    #[test]
    fn scanner_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<DocumentScanner>();
    }
}
