// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Four-point homography: the projective transform taking a photographed
// quadrilateral exactly onto an upright rectangle, plus its inverse.

use docscan_core::error::{DocScanError, Result};
use docscan_core::{ImageSize, Point2D, Quadrilateral};
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use tracing::{debug, instrument};

/// Determinant of the normalized 8x8 system below which it is treated as
/// singular. Normalized coordinates are O(1), so this is scale-free.
const SYSTEM_DET_EPSILON: f64 = 1e-10;

/// Determinant of the 3x3 matrix, relative to its Hadamard bound, below
/// which it is degenerate.
const MATRIX_DET_EPSILON: f64 = 1e-12;

/// Area (px²) below which a quadrilateral has collapsed.
const MIN_QUAD_AREA: f64 = 1e-6;

/// A 3x3 projective transform, scaled so `h33 = 1` where possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Wrap a raw matrix, rejecting non-finite or (near-)singular ones.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(DocScanError::degenerate("matrix has non-finite entries"));
        }
        // Hadamard's bound: |det| <= product of column norms.
        let bound: f64 = matrix.column_iter().map(|c| c.norm()).product();
        if bound == 0.0 {
            return Err(DocScanError::degenerate("matrix has a zero column"));
        }
        let relative_det = matrix.determinant() / bound;
        if relative_det.abs() < MATRIX_DET_EPSILON {
            return Err(DocScanError::degenerate(format!(
                "matrix is singular (relative determinant {relative_det:e})"
            )));
        }

        let h33 = matrix[(2, 2)];
        let matrix = if h33.abs() > f64::EPSILON {
            matrix / h33
        } else {
            matrix
        };
        Ok(Self { matrix })
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn determinant(&self) -> f64 {
        self.matrix.determinant()
    }

    /// Map a point through the transform. Returns `None` for points sent to
    /// the line at infinity.
    pub fn project(&self, point: Point2D) -> Option<Point2D> {
        let p = self.matrix * Vector3::new(point.x, point.y, 1.0);
        if p[2].abs() < 1e-15 {
            return None;
        }
        Some(Point2D::new(p[0] / p[2], p[1] / p[2]))
    }

    /// The reverse mapping (destination back to source).
    pub fn inverse(&self) -> Result<Self> {
        let inv = self
            .matrix
            .try_inverse()
            .ok_or_else(|| DocScanError::degenerate("homography is not invertible"))?;
        Self::from_matrix(inv)
    }

    /// Row-major coefficients, for tight per-pixel loops.
    pub fn coefficients(&self) -> [f64; 9] {
        let m = &self.matrix;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }
}

/// Output dimensions for rectifying `quad`.
///
/// Width is the longer of the top and bottom edges, height the longer of the
/// left and right edges, each rounded to whole pixels and floored at
/// `min_side`. The output therefore keeps the photographed page's aspect.
pub fn rectified_size(quad: &Quadrilateral, min_side: u32) -> ImageSize {
    let width = quad.top_edge().max(quad.bottom_edge());
    let height = quad.left_edge().max(quad.right_edge());
    let to_px = |len: f64| -> u32 {
        if len.is_finite() {
            (len.round().min(u32::MAX as f64) as u32).max(min_side)
        } else {
            min_side
        }
    };
    ImageSize::new(to_px(width), to_px(height))
}

/// Compute the homography taking each corner of `src` onto the matching
/// corner of `dst`.
///
/// Fails with `Degenerate` when either quadrilateral has duplicate,
/// collinear, reflex, or crossing corners, or when the linear system is
/// numerically singular. Never returns a fallback transform.
#[instrument(skip_all)]
pub fn compute_homography(src: &Quadrilateral, dst: &Quadrilateral) -> Result<Homography> {
    check_quad("source", src)?;
    check_quad("destination", dst)?;

    let (t_src, src_n) = normalize_points(src.corners());
    let (t_dst, dst_n) = normalize_points(dst.corners());

    // Standard 4-point formulation with h33 fixed to 1:
    //   [x y 1 0 0 0 -ux -uy] h = u
    //   [0 0 0 x y 1 -vx -vy] h = v
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for i in 0..4 {
        let (x, y) = (src_n[i].x, src_n[i].y);
        let (u, v) = (dst_n[i].x, dst_n[i].y);
        let r = 2 * i;

        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let lu = a.lu();
    let det = lu.determinant();
    if !det.is_finite() || det.abs() < SYSTEM_DET_EPSILON {
        return Err(DocScanError::degenerate(format!(
            "correspondence system is singular (determinant {det:e})"
        )));
    }
    let h = lu
        .solve(&b)
        .ok_or_else(|| DocScanError::degenerate("correspondence system has no solution"))?;

    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);

    // Denormalize: H = T_dst^-1 * H_norm * T_src
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| DocScanError::degenerate("destination normalization not invertible"))?;
    let homography = Homography::from_matrix(t_dst_inv * h_norm * t_src)?;

    let tolerance = 1e-6 * (1.0 + dst.top_edge().max(dst.left_edge()));
    for (s, d) in src.corners().iter().zip(dst.corners()) {
        let mapped = homography
            .project(*s)
            .ok_or_else(|| DocScanError::degenerate("corner maps to infinity"))?;
        if mapped.distance(d) > tolerance {
            return Err(DocScanError::degenerate(format!(
                "corner reprojection error {:.3e} px",
                mapped.distance(d)
            )));
        }
    }

    debug!(det = homography.determinant(), "Homography solved");
    Ok(homography)
}

/// Rectification plan for a quadrilateral: target size and the forward
/// homography from the photo onto the target rectangle.
pub fn plan_rectification(quad: &Quadrilateral, min_side: u32) -> Result<(Homography, ImageSize)> {
    let size = rectified_size(quad, min_side);
    let target = Quadrilateral::full_frame(size);
    let homography = compute_homography(quad, &target)?;
    Ok((homography, size))
}

fn check_quad(role: &str, quad: &Quadrilateral) -> Result<()> {
    if quad.corners().iter().any(|p| !p.is_finite()) {
        return Err(DocScanError::degenerate(format!(
            "{role} corners are not finite"
        )));
    }
    if !quad.has_distinct_corners() {
        return Err(DocScanError::degenerate(format!(
            "{role} corners contain duplicates"
        )));
    }
    if quad.area() < MIN_QUAD_AREA {
        return Err(DocScanError::degenerate(format!(
            "{role} corners enclose no area"
        )));
    }
    if !quad.is_strictly_convex() {
        return Err(DocScanError::degenerate(format!(
            "{role} corners are collinear, concave, or self-intersecting"
        )));
    }
    Ok(())
}

/// Translate the centroid to the origin and scale so the mean distance from
/// it is sqrt(2).
fn normalize_points(pts: &[Point2D; 4]) -> (Matrix3<f64>, [Point2D; 4]) {
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;

    let mean_dist = pts
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / 4.0;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.map(|p| Point2D::new(s * (p.x - cx), s * (p.y - cy)));
    (t, normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed() -> Quadrilateral {
        Quadrilateral::from_points([
            Point2D::new(100.0, 150.0),
            Point2D::new(900.0, 140.0),
            Point2D::new(920.0, 1300.0),
            Point2D::new(90.0, 1310.0),
        ])
    }

    #[test]
    fn maps_corners_exactly() {
        let (h, size) = plan_rectification(&skewed(), 1).expect("solvable");
        let target = Quadrilateral::full_frame(size);
        for (s, d) in skewed().corners().iter().zip(target.corners()) {
            let p = h.project(*s).expect("finite");
            assert!(p.distance(d) < 1e-6, "{p:?} vs {d:?}");
        }
    }

    #[test]
    fn inverse_round_trips() {
        let (h, _) = plan_rectification(&skewed(), 1).expect("solvable");
        let inv = h.inverse().expect("invertible");
        let probe = Point2D::new(400.0, 700.0);
        let back = inv.project(h.project(probe).expect("fwd")).expect("inv");
        assert!(back.distance(&probe) < 1e-6);
    }

    #[test]
    fn size_follows_longest_edges() {
        let size = rectified_size(&skewed(), 1);
        // top ~800.06, bottom ~830.06, left ~1160.04, right ~1160.17
        assert_eq!(size, ImageSize::new(830, 1160));
    }

    #[test]
    fn size_is_floored() {
        let tiny = Quadrilateral::from_points([
            Point2D::new(0.0, 0.0),
            Point2D::new(0.2, 0.0),
            Point2D::new(0.2, 0.2),
            Point2D::new(0.0, 0.2),
        ]);
        assert_eq!(rectified_size(&tiny, 1), ImageSize::new(1, 1));
    }

    #[test]
    fn identical_quads_give_identity() {
        let frame = Quadrilateral::full_frame(ImageSize::new(64, 48));
        let h = compute_homography(&frame, &frame).expect("solvable");
        let diff = (h.matrix() - Matrix3::identity()).amax();
        assert!(diff < 1e-9, "deviation {diff}");
    }

    #[test]
    fn collinear_corners_are_degenerate() {
        let line = Quadrilateral::from_points([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(20.0, 20.0),
            Point2D::new(30.0, 30.0),
        ]);
        let target = Quadrilateral::full_frame(ImageSize::new(10, 10));
        let err = compute_homography(&line, &target).unwrap_err();
        assert!(matches!(err, DocScanError::Degenerate(_)));
    }

    #[test]
    fn duplicate_corners_are_degenerate() {
        let dup = Quadrilateral::from_points([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ]);
        assert!(plan_rectification(&dup, 1).is_err());
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let singular = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0);
        assert!(Homography::from_matrix(singular).is_err());
        assert!(Homography::from_matrix(Matrix3::zeros()).is_err());
    }
}
