// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — edge extraction, quadrilateral detection, homography,
// rectification warp, and enhancement.

pub mod detect;
pub mod edges;
pub mod enhance;
pub mod homography;
pub mod polygon;
pub mod threshold;
pub mod warp;

pub use detect::{Candidate, QuadDetector};
pub use edges::{EdgeMap, extract_edges};
pub use enhance::ScanEnhancer;
pub use homography::{Homography, compute_homography, plan_rectification, rectified_size};
pub use warp::warp;
