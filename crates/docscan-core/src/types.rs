// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for docscan: points, quadrilaterals, image sizes, and the
// detection preview record handed to boundary layers.
//
// Coordinates are continuous image coordinates. Pixel (i, j) covers
// [i, i+1) x [j, j+1), so an image's own corners are (0,0), (W,0), (W,H), (0,H).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{DocScanError, Result};

/// Two points closer than this are considered the same corner.
pub const COINCIDENT_EPSILON: f64 = 1e-6;

/// A point in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Whether `point` lies inside the frame `[0, W] x [0, H]`, allowing
    /// `tolerance` pixels of slack on every side.
    pub fn contains(&self, point: &Point2D, tolerance: f64) -> bool {
        point.x >= -tolerance
            && point.y >= -tolerance
            && point.x <= self.width as f64 + tolerance
            && point.y <= self.height as f64 + tolerance
    }
}

/// Four corners in canonical order: top-left, top-right, bottom-right,
/// bottom-left.
///
/// Every constructor normalizes its input, so two quadrilaterals built from the
/// same four points in any order compare equal.
///
/// Serialized as a bare array of four points; deserialization goes through
/// [`Quadrilateral::from_points`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Point2D; 4]", into = "[Point2D; 4]")]
pub struct Quadrilateral {
    corners: [Point2D; 4],
}

impl From<[Point2D; 4]> for Quadrilateral {
    fn from(points: [Point2D; 4]) -> Self {
        Self::from_points(points)
    }
}

impl From<Quadrilateral> for [Point2D; 4] {
    fn from(quad: Quadrilateral) -> Self {
        quad.corners
    }
}

impl Quadrilateral {
    /// Build a quadrilateral from exactly four points in any order.
    pub fn from_points(points: [Point2D; 4]) -> Self {
        Self {
            corners: canonical_order(points),
        }
    }

    /// Build a quadrilateral from a caller-supplied corner list.
    ///
    /// Fails with `InvalidInput` unless the list holds exactly four finite
    /// points.
    pub fn from_corner_list(points: &[Point2D]) -> Result<Self> {
        let corners: [Point2D; 4] = points.try_into().map_err(|_| {
            DocScanError::invalid(format!("expected 4 corners, got {}", points.len()))
        })?;
        if let Some(bad) = corners.iter().find(|p| !p.is_finite()) {
            return Err(DocScanError::invalid(format!(
                "corner ({}, {}) is not a finite coordinate",
                bad.x, bad.y
            )));
        }
        Ok(Self::from_points(corners))
    }

    /// The quadrilateral covering the whole image frame.
    pub fn full_frame(size: ImageSize) -> Self {
        let (w, h) = (size.width as f64, size.height as f64);
        Self {
            corners: [
                Point2D::new(0.0, 0.0),
                Point2D::new(w, 0.0),
                Point2D::new(w, h),
                Point2D::new(0.0, h),
            ],
        }
    }

    pub fn corners(&self) -> &[Point2D; 4] {
        &self.corners
    }

    pub fn top_left(&self) -> Point2D {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point2D {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point2D {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point2D {
        self.corners[3]
    }

    pub fn top_edge(&self) -> f64 {
        self.corners[0].distance(&self.corners[1])
    }

    pub fn bottom_edge(&self) -> f64 {
        self.corners[3].distance(&self.corners[2])
    }

    pub fn left_edge(&self) -> f64 {
        self.corners[0].distance(&self.corners[3])
    }

    pub fn right_edge(&self) -> f64 {
        self.corners[1].distance(&self.corners[2])
    }

    /// Enclosed area via the shoelace formula.
    pub fn area(&self) -> f64 {
        signed_area(&self.corners).abs()
    }

    /// Mean of the four corners.
    pub fn centroid(&self) -> Point2D {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2D::new(sx / 4.0, sy / 4.0)
    }

    /// True when every turn along the boundary has the same, non-zero sign.
    ///
    /// Collinear, duplicated, reflex, and self-intersecting corner sets all
    /// fail this check.
    pub fn is_strictly_convex(&self) -> bool {
        is_strictly_convex(&self.corners)
    }

    /// True when no two corners coincide.
    pub fn has_distinct_corners(&self) -> bool {
        for i in 0..4 {
            for j in (i + 1)..4 {
                if self.corners[i].distance(&self.corners[j]) < COINCIDENT_EPSILON {
                    return false;
                }
            }
        }
        true
    }

    /// Every corner lies inside `size`, with `tolerance` pixels of slack.
    pub fn fits_within(&self, size: ImageSize, tolerance: f64) -> bool {
        self.corners.iter().all(|p| size.contains(p, tolerance))
    }

    /// Uniformly scale all corners (e.g. from full resolution to preview).
    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_points(self.corners.map(|p| p.scaled(factor)))
    }

    /// Scale each axis independently, for previews whose rounded size does
    /// not keep the exact aspect ratio.
    pub fn scaled_xy(&self, sx: f64, sy: f64) -> Self {
        Self::from_points(self.corners.map(|p| Point2D::new(p.x * sx, p.y * sy)))
    }

    /// Pull every corner inside the frame `[0, W] x [0, H]`.
    pub fn clamped_to(&self, size: ImageSize) -> Self {
        let (w, h) = (size.width as f64, size.height as f64);
        Self::from_points(
            self.corners
                .map(|p| Point2D::new(p.x.clamp(0.0, w), p.y.clamp(0.0, h))),
        )
    }

    /// Corners as `[x, y]` pairs, the shape boundary layers exchange.
    pub fn to_pairs(&self) -> [[f64; 2]; 4] {
        self.corners.map(|p| [p.x, p.y])
    }
}

/// Where the quadrilateral used for a rectification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerSource {
    /// Found by edge detection.
    Detected,
    /// Supplied by the caller.
    Caller,
    /// Detection found nothing; the whole frame was used.
    FullFrameFallback,
}

/// Size of the downscaled copy detection ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

/// Outcome of a detection run in the shape the preview UI consumes.
///
/// `corners` are full-resolution pixel coordinates in canonical order;
/// multiply by `ratio` to get preview coordinates. `image`, when present, is
/// the preview the corners were found on as a base64 JPEG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionPreview {
    pub corners: [[f64; 2]; 4],
    pub ratio: f64,
    pub preview_size: PreviewSize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl DetectionPreview {
    pub fn quadrilateral(&self) -> Quadrilateral {
        Quadrilateral::from_points(self.corners.map(Point2D::from))
    }

    /// Corners in preview-image coordinates.
    pub fn preview_corners(&self) -> [[f64; 2]; 4] {
        self.quadrilateral().scaled(self.ratio).to_pairs()
    }
}

// -- Ordering helpers ---------------------------------------------------------

fn by_sum(a: &Point2D, b: &Point2D) -> Ordering {
    (a.x + a.y)
        .total_cmp(&(b.x + b.y))
        .then(a.y.total_cmp(&b.y))
        .then(a.x.total_cmp(&b.x))
}

fn by_diff(a: &Point2D, b: &Point2D) -> Ordering {
    (a.y - a.x)
        .total_cmp(&(b.y - b.x))
        .then(a.y.total_cmp(&b.y))
        .then(a.x.total_cmp(&b.x))
}

fn index_of_min(points: &[Point2D; 4], cmp: fn(&Point2D, &Point2D) -> Ordering) -> usize {
    (1..4).fold(0, |best, i| {
        if cmp(&points[i], &points[best]) == Ordering::Less {
            i
        } else {
            best
        }
    })
}

fn index_of_max(points: &[Point2D; 4], cmp: fn(&Point2D, &Point2D) -> Ordering) -> usize {
    (1..4).fold(0, |best, i| {
        if cmp(&points[i], &points[best]) == Ordering::Greater {
            i
        } else {
            best
        }
    })
}

/// Order four points as top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest `x + y`, bottom-right the largest; top-right has
/// the smallest `y - x`, bottom-left the largest. When those four picks are
/// not four different points, or would trace a self-intersecting outline,
/// the points are instead ordered clockwise around their centroid starting
/// from the smallest `x + y`.
fn canonical_order(points: [Point2D; 4]) -> [Point2D; 4] {
    let tl = index_of_min(&points, by_sum);
    let br = index_of_max(&points, by_sum);
    let tr = index_of_min(&points, by_diff);
    let bl = index_of_max(&points, by_diff);

    let mut seen = [false; 4];
    for i in [tl, tr, br, bl] {
        seen[i] = true;
    }
    if seen.iter().all(|&s| s) {
        let ordered = [points[tl], points[tr], points[br], points[bl]];
        if !crosses_itself(&ordered) {
            return ordered;
        }
    }

    angular_order(points)
}

fn angular_order(points: [Point2D; 4]) -> [Point2D; 4] {
    let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;

    let mut sorted = points;
    // y grows downwards, so increasing atan2 walks clockwise on screen.
    sorted.sort_by(|a, b| {
        let ta = (a.y - cy).atan2(a.x - cx);
        let tb = (b.y - cy).atan2(b.x - cx);
        ta.total_cmp(&tb).then_with(|| by_sum(a, b))
    });

    let start = index_of_min(&sorted, by_sum);
    sorted.rotate_left(start);
    sorted
}

fn cross(o: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn signed_area(corners: &[Point2D; 4]) -> f64 {
    let mut twice = 0.0;
    for i in 0..4 {
        let j = (i + 1) % 4;
        twice += corners[i].x * corners[j].y - corners[j].x * corners[i].y;
    }
    twice / 2.0
}

fn is_strictly_convex(corners: &[Point2D; 4]) -> bool {
    let mut sign = 0.0f64;
    for i in 0..4 {
        let turn = cross(&corners[i], &corners[(i + 1) % 4], &corners[(i + 2) % 4]);
        if turn == 0.0 || !turn.is_finite() {
            return false;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

/// Whether the closed outline a-b-c-d has intersecting opposite edges.
fn crosses_itself(c: &[Point2D; 4]) -> bool {
    segments_intersect(&c[0], &c[1], &c[2], &c[3]) || segments_intersect(&c[1], &c[2], &c[3], &c[0])
}

fn segments_intersect(p1: &Point2D, p2: &Point2D, q1: &Point2D, q2: &Point2D) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}
