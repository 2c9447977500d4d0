// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-document — Image geometry for the docscan document scanner.
//
// Provides raster decoding and encoding, edge extraction, quadrilateral
// detection, four-point homographies, rectification warping, scan
// enhancement, and the `DocumentScanner` that ties them together.

pub mod pipeline;
pub mod raster;
pub mod scan;

// Re-export the primary structs so callers can use `docscan_document::DocumentScanner` etc.
pub use pipeline::{DocumentScanner, ScanResult};
pub use raster::Raster;
pub use scan::{EdgeMap, Homography, QuadDetector, ScanEnhancer};
