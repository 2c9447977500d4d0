// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thresholding primitives shared by edge extraction and enhancement: a
// local-mean threshold with an offset and selectable polarity, and Otsu's
// global threshold.

use image::GrayImage;
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::integral_image::{integral_image, sum_image_pixels};

/// Which side of the local threshold is painted white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Pixels at or above the threshold become white (paper stays white).
    Normal,
    /// Pixels below the threshold become white (ink becomes foreground).
    Inverted,
}

/// Local-mean adaptive threshold.
///
/// The threshold for each pixel is the rounded mean of the square
/// `block_radius` neighbourhood (clipped to the image) minus `offset`.
pub fn adaptive_threshold(
    gray: &GrayImage,
    block_radius: u32,
    offset: i32,
    polarity: Polarity,
) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let integral = integral_image::<_, u64>(gray);
    let (below, above) = match polarity {
        Polarity::Normal => (0u8, 255u8),
        Polarity::Inverted => (255u8, 0u8),
    };

    GrayImage::from_fn(width, height, |x, y| {
        let left = x.saturating_sub(block_radius);
        let top = y.saturating_sub(block_radius);
        let right = x.saturating_add(block_radius).min(width - 1);
        let bottom = y.saturating_add(block_radius).min(height - 1);

        let count = u64::from(right - left + 1) * u64::from(bottom - top + 1);
        let sum = sum_image_pixels(&integral, left, top, right, bottom)[0];
        let mean = (sum + count / 2) / count;

        let level = (mean as i32 - offset).clamp(0, 255);
        let value = i32::from(gray.get_pixel(x, y).0[0]);
        image::Luma([if value < level { below } else { above }])
    })
}

/// Binarize at Otsu's level: pixels above it become white.
///
/// Returns the level alongside the binary image.
pub fn otsu_binarize(gray: &GrayImage) -> (u8, GrayImage) {
    if gray.width() == 0 || gray.height() == 0 {
        return (0, gray.clone());
    }
    let level = otsu_level(gray);
    (level, threshold(gray, level, ThresholdType::Binary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn two_tone() -> GrayImage {
        GrayImage::from_fn(40, 20, |x, _| Luma([if x < 20 { 30 } else { 220 }]))
    }

    #[test]
    fn otsu_splits_two_tones() {
        let (level, binary) = otsu_binarize(&two_tone());
        assert!((30..220).contains(&level), "level {level}");
        assert_eq!(binary.get_pixel(5, 5).0[0], 0);
        assert_eq!(binary.get_pixel(35, 5).0[0], 255);
    }

    #[test]
    fn uniform_image_has_no_inverted_foreground() {
        let flat = GrayImage::from_pixel(16, 16, Luma([140]));
        let out = adaptive_threshold(&flat, 5, 2, Polarity::Inverted);
        assert!(out.pixels().all(|p| p.0[0] == 0));
        let normal = adaptive_threshold(&flat, 5, 2, Polarity::Normal);
        assert!(normal.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn dark_stroke_stands_out_locally() {
        let mut img = GrayImage::from_pixel(30, 30, Luma([200]));
        for y in 0..30 {
            img.put_pixel(15, y, Luma([20]));
        }
        let out = adaptive_threshold(&img, 3, 10, Polarity::Normal);
        assert_eq!(out.get_pixel(15, 10).0[0], 0);
        assert_eq!(out.get_pixel(5, 10).0[0], 255);
    }

    #[test]
    fn neighbourhood_is_clipped_at_borders() {
        // A radius larger than the image must still average real pixels only.
        let img = GrayImage::from_fn(4, 4, |x, _| Luma([if x == 0 { 10 } else { 90 }]));
        let out = adaptive_threshold(&img, 10, 0, Polarity::Normal);
        // Mean is 70: the dark column falls below it, the rest stay white.
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn empty_images_pass_through() {
        let empty = GrayImage::new(0, 3);
        assert_eq!(adaptive_threshold(&empty, 3, 0, Polarity::Normal).dimensions(), (0, 3));
        assert_eq!(otsu_binarize(&empty).1.dimensions(), (0, 3));
    }
}
