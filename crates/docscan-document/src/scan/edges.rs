// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge map extraction: luminance, Gaussian smoothing, Canny, and a
// morphological close so that a document outline forms one closed loop for
// contour tracing.

use docscan_core::config::EdgeConfig;
use docscan_core::ImageSize;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;
use tracing::{debug, instrument};

use super::threshold::{Polarity, adaptive_threshold};

/// Value stored for edge pixels.
pub const EDGE: u8 = 255;

/// Binary single-channel map: `EDGE` on likely boundary pixels, 0 elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    map: GrayImage,
}

impl EdgeMap {
    /// Wrap an existing map; any non-zero pixel counts as an edge.
    pub fn from_gray(map: GrayImage) -> Self {
        let mut map = map;
        for pixel in map.pixels_mut() {
            if pixel.0[0] != 0 {
                pixel.0[0] = EDGE;
            }
        }
        Self { map }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.map.width(), self.map.height())
    }

    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.map.get_pixel(x, y).0[0] != 0
    }

    pub fn edge_count(&self) -> usize {
        self.map.pixels().filter(|p| p.0[0] != 0).count()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.map
    }

    pub fn into_gray(self) -> GrayImage {
        self.map
    }
}

/// Convert an image into an edge map.
///
/// ## Pipeline
///
/// 1. Convert to luma
/// 2. Gaussian blur (`blur_sigma`) for noise reduction
/// 3. Canny edge detection (`canny_low` / `canny_high`)
/// 4. Optionally OR with an inverted local-mean threshold, which catches
///    low-contrast page borders Canny misses
/// 5. Square morphological close (`close_radius`) to bridge gaps in the
///    outline without thickening it, so traced contours stay on the edge
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn extract_edges(image: &DynamicImage, config: &EdgeConfig) -> EdgeMap {
    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, config.blur_sigma);

    let mut edges = canny(&blurred, config.canny_low, config.canny_high);

    if config.combine_adaptive_threshold {
        let ink = adaptive_threshold(
            &blurred,
            config.adaptive_block_radius,
            config.adaptive_offset,
            Polarity::Inverted,
        );
        union_into(&mut edges, &ink);
    }

    if config.close_radius > 0 {
        edges = close(&edges, Norm::LInf, config.close_radius);
    }

    let map = EdgeMap::from_gray(edges);
    debug!(edge_pixels = map.edge_count(), "Edge map extracted");
    map
}

fn union_into(target: &mut GrayImage, other: &GrayImage) {
    for (dst, src) in target.pixels_mut().zip(other.pixels()) {
        if src.0[0] != 0 {
            *dst = Luma([EDGE]);
        }
    }
}
