// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral detection: trace the outer contours of an edge map, reduce
// each to a polygon, and keep the largest convex four-sided one.

use std::cmp::Ordering;

use docscan_core::config::DetectorConfig;
use docscan_core::error::{DocScanError, Result};
use docscan_core::{ImageSize, Point2D, Quadrilateral};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use tracing::{debug, info, instrument};

use super::edges::EdgeMap;
use super::polygon::{perimeter, simplify_closed};

/// A polygon that passed every filter, with the data used to rank it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub quad: Quadrilateral,
    pub area: f64,
    /// Distance from the quadrilateral's centroid to the image centre.
    pub center_offset: f64,
    /// Position of the source contour in tracing order.
    pub trace_index: usize,
}

/// Finds the document outline in an [`EdgeMap`].
#[derive(Debug, Clone, Default)]
pub struct QuadDetector {
    config: DetectorConfig,
}

impl QuadDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Return the best quadrilateral, or `NotFound`.
    ///
    /// Never invents corners: the optional minimum-area-rectangle fallback
    /// still comes from a traced contour and must pass the same area bounds.
    #[instrument(skip_all, fields(width = edges.size().width, height = edges.size().height))]
    pub fn detect(&self, edges: &EdgeMap) -> Result<Quadrilateral> {
        let size = edges.size();
        if size.is_empty() {
            return Err(DocScanError::NotFound);
        }

        let contours = external_contours(edges);
        let candidates = self.rank(&contours, size);
        if let Some(best) = candidates.first() {
            info!(
                area = best.area,
                candidates = candidates.len(),
                "Document quadrilateral found"
            );
            return Ok(best.quad);
        }

        if self.config.min_area_rect_fallback {
            if let Some(quad) = self.bounding_rect_fallback(&contours, size) {
                info!(area = quad.area(), "Using minimum-area rectangle fallback");
                return Ok(quad);
            }
        }

        debug!(contours = contours.len(), "No qualifying quadrilateral");
        Err(DocScanError::NotFound)
    }

    /// All qualifying quadrilaterals, best first.
    pub fn candidates(&self, edges: &EdgeMap) -> Vec<Candidate> {
        let size = edges.size();
        if size.is_empty() {
            return Vec::new();
        }
        self.rank(&external_contours(edges), size)
    }

    fn rank(&self, contours: &[Vec<Point2D>], size: ImageSize) -> Vec<Candidate> {
        let image_area = size.area();
        let center = size.center();

        let mut candidates: Vec<Candidate> = contours
            .iter()
            .enumerate()
            .filter_map(|(trace_index, points)| {
                let quad = self.approximate(points)?;
                let area = quad.area();
                debug!(trace_index, area, "Quadrilateral candidate");
                if !self.area_qualifies(area, image_area) {
                    return None;
                }
                Some(Candidate {
                    quad,
                    area,
                    center_offset: quad.centroid().distance(&center),
                    trace_index,
                })
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates
    }

    /// Reduce a contour to a strictly convex quadrilateral, if it is one.
    fn approximate(&self, points: &[Point2D]) -> Option<Quadrilateral> {
        if points.len() < 4 {
            return None;
        }
        let epsilon = self.config.epsilon_ratio * perimeter(points, true);
        let polygon = simplify_closed(points, epsilon);
        if polygon.len() != 4 {
            debug!(vertices = polygon.len(), "Contour is not four-sided");
            return None;
        }
        let quad = Quadrilateral::from_corner_list(&polygon).ok()?;
        quad.is_strictly_convex().then_some(quad)
    }

    fn area_qualifies(&self, area: f64, image_area: f64) -> bool {
        area > self.config.min_area_ratio * image_area
            && area < self.config.max_area_ratio * image_area
    }

    /// Minimum-area bounding rectangle of the longest outer contour.
    fn bounding_rect_fallback(
        &self,
        contours: &[Vec<Point2D>],
        size: ImageSize,
    ) -> Option<Quadrilateral> {
        let largest = contours
            .iter()
            .filter(|c| c.len() >= 4)
            .max_by(|a, b| perimeter(a, true).total_cmp(&perimeter(b, true)))?;

        // Back to integer pixel indices for imageproc.
        let pixels: Vec<Point<i32>> = largest
            .iter()
            .map(|p| Point::new((p.x - 0.5) as i32, (p.y - 0.5) as i32))
            .collect();
        let rect = min_area_rect(&pixels).map(pixel_center);
        let quad = Quadrilateral::from_points(rect);

        let qualifies = quad.is_strictly_convex()
            && quad.has_distinct_corners()
            && self.area_qualifies(quad.area(), size.area());
        qualifies.then(|| quad.clamped_to(size))
    }
}

/// Outer borders of the top-level connected components, as pixel-centre
/// coordinates.
fn external_contours(edges: &EdgeMap) -> Vec<Vec<Point2D>> {
    let contours: Vec<Contour<i32>> = find_contours::<i32>(edges.as_gray());
    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points.into_iter().map(pixel_center).collect())
        .collect()
}

fn pixel_center(p: Point<i32>) -> Point2D {
    Point2D::new(p.x as f64 + 0.5, p.y as f64 + 0.5)
}

/// Larger area first, then closer to the image centre, then earlier trace.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.area
        .total_cmp(&a.area)
        .then(a.center_offset.total_cmp(&b.center_offset))
        .then(a.trace_index.cmp(&b.trace_index))
}
