// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encoded image fixtures shared by the bridge tests.

use docscan_document::Raster;
use image::{DynamicImage, GrayImage, Luma};

/// 200x260 dark photo with a light page at (30,40)-(170,220), as PNG.
pub fn page_png() -> Vec<u8> {
    let img = GrayImage::from_fn(200, 260, |x, y| {
        if (30..170).contains(&x) && (40..220).contains(&y) {
            Luma([240])
        } else {
            Luma([25])
        }
    });
    encode(img)
}

/// Featureless grey image, as PNG.
pub fn uniform_png() -> Vec<u8> {
    encode(GrayImage::from_pixel(120, 90, Luma([128])))
}

fn encode(img: GrayImage) -> Vec<u8> {
    Raster::from_dynamic(DynamicImage::ImageLuma8(img))
        .to_png_bytes()
        .expect("png encoding")
}
