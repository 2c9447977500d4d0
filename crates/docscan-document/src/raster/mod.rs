// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module — decoding, encoding, previews, and tone adjustment.

pub mod buffer;

pub use buffer::Raster;
