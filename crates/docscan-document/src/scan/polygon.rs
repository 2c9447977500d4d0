// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Polygon helpers for contour simplification: perimeter, point-to-line
// distance, Douglas-Peucker reduction of closed curves, and collinear-vertex
// collapse.

use docscan_core::Point2D;

/// Length of a polyline; `closed` adds the segment back to the start.
pub fn perimeter(points: &[Point2D], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let open: f64 = points.windows(2).map(|w| w[0].distance(&w[1])).sum();
    if closed {
        open + points[points.len() - 1].distance(&points[0])
    } else {
        open
    }
}

/// Perpendicular distance from `point` to the infinite line through
/// `line_start` and `line_end`. Falls back to point distance when the two
/// line points coincide.
pub fn point_to_line_distance(point: &Point2D, line_start: &Point2D, line_end: &Point2D) -> f64 {
    let a = line_end.y - line_start.y;
    let b = line_start.x - line_end.x;
    let c = line_end.x * line_start.y - line_start.x * line_end.y;

    let denominator = a.hypot(b);
    if denominator == 0.0 {
        return point.distance(line_start);
    }

    (a * point.x + b * point.y + c).abs() / denominator
}

/// Simplify a closed curve to a polygon whose edges stay within `epsilon`
/// of every original point.
///
/// The loop is cut at the point farthest from the first one and at the point
/// farthest from that; the trace's starting pixel is never kept for its own
/// sake. Each half is reduced with Douglas-Peucker and the joined polygon is
/// passed through [`collapse_collinear`].
pub fn simplify_closed(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let first = farthest_from(points, &points[0]);
    let second = farthest_from(points, &points[first]);
    if first == second || points[first].distance(&points[second]) == 0.0 {
        return vec![points[0]];
    }
    let (start, split) = (first.min(second), first.max(second));

    // Both halves run between the two cut points and share their endpoints.
    let mut wrapped: Vec<Point2D> = points[split..].to_vec();
    wrapped.extend_from_slice(&points[..=start]);

    let forward = douglas_peucker(&points[start..=split], epsilon);
    let backward = douglas_peucker(&wrapped, epsilon);

    let mut polygon = Vec::with_capacity(forward.len() + backward.len());
    polygon.extend_from_slice(&forward[..forward.len() - 1]);
    polygon.extend_from_slice(&backward[..backward.len() - 1]);

    collapse_collinear(&mut polygon, epsilon);
    polygon
}

/// Index of the point farthest from `origin`; the lowest index wins ties.
fn farthest_from(points: &[Point2D], origin: &Point2D) -> usize {
    let mut best = 0;
    let mut best_dist = 0.0;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance(origin);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Repeatedly remove the vertex that deviates least from the chord joining
/// its neighbours, while that deviation is below `epsilon` and more than
/// three vertices remain. Ties go to the lowest index.
pub fn collapse_collinear(polygon: &mut Vec<Point2D>, epsilon: f64) {
    while polygon.len() > 3 {
        let n = polygon.len();
        let mut weakest = None;
        let mut weakest_dist = f64::INFINITY;
        for i in 0..n {
            let prev = polygon[(i + n - 1) % n];
            let next = polygon[(i + 1) % n];
            let d = point_to_line_distance(&polygon[i], &prev, &next);
            if d < weakest_dist {
                weakest_dist = d;
                weakest = Some(i);
            }
        }
        match weakest {
            Some(i) if weakest_dist < epsilon => {
                polygon.remove(i);
            }
            _ => break,
        }
    }
}

/// Iterative Douglas-Peucker on an open polyline. Both endpoints are always
/// kept.
fn douglas_peucker(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end - start <= 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_index = start;
        for i in (start + 1)..end {
            let dist = point_to_line_distance(&points[i], &points[start], &points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trace the boundary of an axis-aligned rectangle one unit at a time,
    /// starting part-way along the top edge.
    fn traced_rectangle(w: i32, h: i32) -> Vec<Point2D> {
        let mut pts = Vec::new();
        for x in 5..w {
            pts.push(Point2D::new(x as f64, 0.0));
        }
        for y in 0..h {
            pts.push(Point2D::new(w as f64, y as f64));
        }
        for x in (1..=w).rev() {
            pts.push(Point2D::new(x as f64, h as f64));
        }
        for y in (1..=h).rev() {
            pts.push(Point2D::new(0.0, y as f64));
        }
        for x in 0..5 {
            pts.push(Point2D::new(x as f64, 0.0));
        }
        pts
    }

    #[test]
    fn rectangle_simplifies_to_four_corners() {
        let pts = traced_rectangle(40, 20);
        let eps = 0.02 * perimeter(&pts, true);
        let poly = simplify_closed(&pts, eps);
        assert_eq!(poly.len(), 4, "{poly:?}");
        for corner in [(0.0, 0.0), (40.0, 0.0), (40.0, 20.0), (0.0, 20.0)] {
            assert!(
                poly.iter().any(|p| p.x == corner.0 && p.y == corner.1),
                "missing corner {corner:?} in {poly:?}"
            );
        }
    }

    /// Walk the outline of `corners` in unit steps, rounding to the pixel
    /// grid, and start the loop at the first point in raster order the way
    /// contour tracing does.
    fn raster_trace(corners: [(f64, f64); 4]) -> Vec<Point2D> {
        let mut pts: Vec<Point2D> = Vec::new();
        for i in 0..4 {
            let (x0, y0) = corners[i];
            let (x1, y1) = corners[(i + 1) % 4];
            let steps = (x1 - x0).hypot(y1 - y0).ceil() as usize;
            for k in 0..steps {
                let t = k as f64 / steps as f64;
                let p = Point2D::new((x0 + t * (x1 - x0)).round(), (y0 + t * (y1 - y0)).round());
                if pts.last() != Some(&p) {
                    pts.push(p);
                }
            }
        }
        let origin = (0..pts.len())
            .min_by(|&a, &b| {
                pts[a]
                    .y
                    .total_cmp(&pts[b].y)
                    .then(pts[a].x.total_cmp(&pts[b].x))
            })
            .unwrap_or(0);
        pts.rotate_left(origin);
        pts
    }

    #[test]
    fn tilted_quads_keep_their_true_corners() {
        let quads = [
            // Top edge rises gently to the right: the raster-order start sits
            // far left of the top-right corner.
            [(73.0, 110.0), (658.0, 102.0), (672.0, 950.0), (66.0, 957.0)],
            [(40.0, 52.0), (560.0, 40.0), (575.0, 420.0), (30.0, 430.0)],
            [(50.0, 40.0), (600.0, 47.0), (590.0, 500.0), (60.0, 480.0)],
            [(120.0, 90.0), (500.0, 110.0), (540.0, 520.0), (70.0, 480.0)],
            [(150.0, 60.0), (450.0, 60.0), (560.0, 540.0), (40.0, 540.0)],
            [(300.0, 20.0), (580.0, 300.0), (300.0, 580.0), (20.0, 300.0)],
        ];
        for corners in quads {
            let pts = raster_trace(corners);
            let eps = 0.02 * perimeter(&pts, true);
            let poly = simplify_closed(&pts, eps);
            assert_eq!(poly.len(), 4, "{corners:?} -> {poly:?}");
            for (x, y) in corners {
                let expected = Point2D::new(x, y);
                let nearest = poly
                    .iter()
                    .map(|p| p.distance(&expected))
                    .fold(f64::INFINITY, f64::min);
                assert!(nearest <= 2.5, "corner {expected:?} missed in {poly:?}");
            }
        }
    }

    #[test]
    fn start_point_does_not_matter() {
        let pts = traced_rectangle(60, 30);
        let eps = 0.02 * perimeter(&pts, true);
        let reference = simplify_closed(&pts, eps);
        for shift in [1, 17, 45, 90, 150] {
            let mut rotated = pts.clone();
            rotated.rotate_left(shift);
            let poly = simplify_closed(&rotated, eps);
            assert_eq!(poly.len(), 4);
            for corner in &reference {
                assert!(poly.contains(corner), "shift {shift}: {poly:?}");
            }
        }
    }

    #[test]
    fn perimeter_of_unit_square() {
        let square = [
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(0.0, 1.0),
        ];
        assert_eq!(perimeter(&square, true), 4.0);
        assert_eq!(perimeter(&square, false), 3.0);
    }

    #[test]
    fn collapse_stops_at_triangle() {
        let mut poly = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(1.0, 1.0),
        ];
        collapse_collinear(&mut poly, 0.5);
        assert_eq!(poly.len(), 3);
        assert!(!poly.contains(&Point2D::new(1.0, 0.0)));
    }

    #[test]
    fn distance_to_degenerate_line() {
        let p = Point2D::new(3.0, 4.0);
        let o = Point2D::new(0.0, 0.0);
        assert_eq!(point_to_line_distance(&p, &o, &o), 5.0);
    }
}
