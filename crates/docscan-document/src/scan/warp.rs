// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification warp: resample a source image through a homography with
// imageproc's projective warp.

use docscan_core::error::{DocScanError, Result};
use docscan_core::ImageSize;
use image::{DynamicImage, ImageBuffer, Luma, Pixel, Rgb, Rgba};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use nalgebra::Matrix3;
use tracing::{debug, info, instrument};

use super::homography::Homography;

/// Warp `image` into an `out_size` canvas through `homography` (source to
/// destination).
///
/// Each destination pixel centre is mapped back into the source with the
/// inverse transform and sampled bilinearly. Source positions more than half
/// a pixel outside the frame take `background`; positions inside the
/// half-pixel margin clamp to the nearest edge pixel.
///
/// Luma, RGB and RGBA images keep their layout. Anything else (16-bit,
/// float, luma-alpha) is converted to RGBA8 first.
#[instrument(skip_all, fields(
    src_w = image.width(),
    src_h = image.height(),
    out_w = out_size.width,
    out_h = out_size.height,
))]
pub fn warp(
    image: &DynamicImage,
    homography: &Homography,
    out_size: ImageSize,
    background: [u8; 4],
) -> Result<DynamicImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DocScanError::invalid("cannot warp an empty image"));
    }
    if out_size.is_empty() {
        return Err(DocScanError::invalid(format!(
            "output size {}x{} is empty",
            out_size.width, out_size.height
        )));
    }

    let projection = padded_projection(homography)?;
    let [r, g, b, a] = background;

    let warped = match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(warp_buffer(
            buf,
            &projection,
            out_size,
            Luma([luma_of(r, g, b)]),
        )),
        DynamicImage::ImageRgb8(buf) => {
            DynamicImage::ImageRgb8(warp_buffer(buf, &projection, out_size, Rgb([r, g, b])))
        }
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(warp_buffer(
            buf,
            &projection,
            out_size,
            Rgba([r, g, b, a]),
        )),
        other => DynamicImage::ImageRgba8(warp_buffer(
            &other.to_rgba8(),
            &projection,
            out_size,
            Rgba([r, g, b, a]),
        )),
    };

    info!("Warp complete");
    Ok(warped)
}

/// Build the forward projection from padded-source indices to destination
/// indices.
///
/// Pixel `i` covers `[i, i + 1)`, so a destination index `d` sits at
/// `d + 0.5`, and continuous source position `s` lands on padded index
/// `s + 0.5` (the padding shifts everything by one).
fn padded_projection(homography: &Homography) -> Result<Projection> {
    let half = Matrix3::new(1.0, 0.0, 0.5, 0.0, 1.0, 0.5, 0.0, 0.0, 1.0);
    let dest_to_padded = half * homography.inverse()?.matrix() * half;
    let coefficients = Homography::from_matrix(dest_to_padded)?
        .coefficients()
        .map(|c| c as f32);

    let inverse = Projection::from_matrix(coefficients)
        .ok_or_else(|| DocScanError::degenerate("warp matrix is singular in f32"))?;
    debug!(?coefficients, "Destination to padded-source mapping");
    Ok(inverse.invert())
}

/// Warp through a one-pixel replicated border.
///
/// imageproc's bilinear sampler returns the default once either neighbour
/// leaves the buffer. With the border, that happens exactly half a pixel
/// outside the original frame, and samples inside the margin see the edge.
fn warp_buffer<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    projection: &Projection,
    out_size: ImageSize,
    background: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let (width, height) = src.dimensions();
    let padded = ImageBuffer::from_fn(width + 2, height + 2, |x, y| {
        *src.get_pixel(
            x.saturating_sub(1).min(width - 1),
            y.saturating_sub(1).min(height - 1),
        )
    });

    let mut out = ImageBuffer::from_pixel(out_size.width, out_size.height, background);
    warp_into(
        &padded,
        projection,
        Interpolation::Bilinear,
        background,
        &mut out,
    );
    out
}

/// Rec. 709 luma, matching `image`'s own RGB -> luma conversion.
fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    let l = 0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64;
    l.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::homography::plan_rectification;
    use docscan_core::{Point2D, Quadrilateral};
    use image::{GrayImage, RgbImage};

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn full_frame_is_pixel_identical() {
        let src = DynamicImage::ImageRgb8(gradient(37, 23));
        let frame = Quadrilateral::full_frame(ImageSize::new(37, 23));
        let (h, size) = plan_rectification(&frame, 1).expect("solvable");
        assert_eq!(size, ImageSize::new(37, 23));

        let out = warp(&src, &h, size, WHITE).expect("warp");
        assert_eq!(out.as_rgb8().expect("stays rgb"), src.as_rgb8().expect("rgb"));
    }

    #[test]
    fn axis_aligned_quad_is_an_exact_crop() {
        let src = gradient(40, 40);
        let quad = Quadrilateral::from_points([
            Point2D::new(10.0, 10.0),
            Point2D::new(30.0, 10.0),
            Point2D::new(30.0, 30.0),
            Point2D::new(10.0, 30.0),
        ]);
        let (h, size) = plan_rectification(&quad, 1).expect("solvable");
        let out = warp(&DynamicImage::ImageRgb8(src.clone()), &h, size, WHITE).expect("warp");
        let out = out.as_rgb8().expect("rgb");
        assert_eq!(out.dimensions(), (20, 20));
        for (x, y) in [(0, 0), (19, 0), (7, 13), (19, 19)] {
            assert_eq!(out.get_pixel(x, y), src.get_pixel(x + 10, y + 10));
        }
    }

    #[test]
    fn outside_the_source_takes_the_background() {
        let src = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([40])));
        // Forward map shifts right by 20.25: dest x samples source x - 19.75.
        let shift = Matrix3::new(1.0, 0.0, 20.25, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let h = Homography::from_matrix(shift).expect("valid");

        let out = warp(&src, &h, ImageSize::new(40, 10), WHITE).expect("warp");
        let luma = out.as_luma8().expect("stays luma");
        assert_eq!(luma.get_pixel(0, 5).0[0], 255);
        assert_eq!(luma.get_pixel(18, 5).0[0], 255);
        // Source x = -0.75 lies beyond the half-pixel margin.
        assert_eq!(luma.get_pixel(19, 5).0[0], 255);
        assert_eq!(luma.get_pixel(20, 5).0[0], 40);
        assert_eq!(luma.get_pixel(29, 5).0[0], 40);
        // Source x = 10.25 is still inside the margin; 11.25 is not.
        assert_eq!(luma.get_pixel(30, 5).0[0], 40);
        assert_eq!(luma.get_pixel(31, 5).0[0], 255);
    }

    #[test]
    fn half_pixel_margin_clamps_to_edge() {
        let src = DynamicImage::ImageLuma8(GrayImage::from_fn(4, 1, |x, _| Luma([x as u8 * 50])));
        // Shift left by 0.4 px: the last column samples source x = 3.9, whose
        // right-hand neighbour clamps to the edge pixel.
        let shift = Matrix3::new(1.0, 0.0, -0.4, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let h = Homography::from_matrix(shift).expect("valid");
        let out = warp(&src, &h, ImageSize::new(4, 1), WHITE).expect("warp");
        let luma = out.as_luma8().expect("luma");
        // Both neighbours are 150; interpolation may truncate by one level.
        assert!((149..=150).contains(&luma.get_pixel(3, 0).0[0]));
        // Interior columns still blend: 0.6 * 100 + 0.4 * 150.
        assert!((119..=120).contains(&luma.get_pixel(2, 0).0[0]));
    }

    #[test]
    fn unusual_layouts_become_rgba() {
        let src = DynamicImage::new_rgb16(8, 8);
        let frame = Quadrilateral::full_frame(ImageSize::new(8, 8));
        let (h, size) = plan_rectification(&frame, 1).expect("solvable");
        let out = warp(&src, &h, size, WHITE).expect("warp");
        assert!(out.as_rgba8().is_some());
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let h = Homography::identity();
        let empty = DynamicImage::new_luma8(0, 5);
        assert!(warp(&empty, &h, ImageSize::new(3, 3), WHITE).is_err());

        let src = DynamicImage::new_luma8(5, 5);
        let err = warp(&src, &h, ImageSize::new(0, 3), WHITE).unwrap_err();
        assert!(matches!(err, DocScanError::InvalidInput(_)));
    }

    #[test]
    fn luma_background_uses_rec709() {
        assert_eq!(luma_of(255, 255, 255), 255);
        assert_eq!(luma_of(0, 0, 0), 0);
        assert_eq!(luma_of(255, 0, 0), 54);
    }
}
