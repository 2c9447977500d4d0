// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DocScanError, Result};

/// Tunable parameters for every pipeline stage.
///
/// A `ScanConfig` is immutable once handed to a scanner; identical configs on
/// identical input always produce identical output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub edges: EdgeConfig,
    pub detector: DetectorConfig,
    pub warp: WarpConfig,
    pub enhance: EnhanceConfig,
}

/// Edge map extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Gaussian blur sigma applied before Canny.
    pub blur_sigma: f32,
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Radius of the square morphological close that bridges gaps in the
    /// edge map (0 disables).
    pub close_radius: u8,
    /// OR the Canny map with an inverted local-mean threshold.
    pub combine_adaptive_threshold: bool,
    pub adaptive_block_radius: u32,
    pub adaptive_offset: i32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 20.0,
            canny_high: 60.0,
            close_radius: 2,
            combine_adaptive_threshold: false,
            adaptive_block_radius: 5,
            adaptive_offset: 2,
        }
    }
}

/// Quadrilateral search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detection runs on a copy whose longer side is at most this many
    /// pixels. `None` runs at full resolution.
    pub detection_max_side: Option<u32>,
    /// Polygon simplification tolerance as a fraction of contour perimeter.
    pub epsilon_ratio: f64,
    /// Candidates must enclose more than this fraction of the image.
    pub min_area_ratio: f64,
    /// Candidates must enclose less than this fraction of the image.
    pub max_area_ratio: f64,
    /// Use the minimum-area rectangle of the largest contour when no contour
    /// simplifies to four corners.
    pub min_area_rect_fallback: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            detection_max_side: Some(1024),
            epsilon_ratio: 0.02,
            min_area_ratio: 0.25,
            max_area_ratio: 0.98,
            min_area_rect_fallback: false,
        }
    }
}

/// Resampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    /// RGBA colour used for destination pixels whose source lies outside the
    /// image frame.
    pub background: [u8; 4],
    /// Lower bound on each output dimension.
    pub min_output_side: u32,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            background: [255, 255, 255, 255],
            min_output_side: 1,
        }
    }
}

/// Post-rectification enhancement applied by scan and process operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhanceMode {
    /// Leave the rectified image untouched.
    None,
    /// Grayscale and contrast stretch.
    Contrast,
    /// Contrast, then a 3x3 sharpen.
    Sharpen,
    /// Contrast, adaptive binarization, and speck removal.
    Document,
    /// Contrast, global Otsu binarization, and speck removal.
    Otsu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub mode: EnhanceMode,
    pub contrast_factor: f32,
    /// Neighbourhood radius for adaptive binarization.
    pub block_radius: u32,
    /// Subtracted from the local mean before thresholding.
    pub offset: i32,
    /// Morphological close radius after binarization (0 disables).
    pub close_radius: u8,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            mode: EnhanceMode::Document,
            contrast_factor: 1.4,
            block_radius: 15,
            offset: 10,
            close_radius: 1,
        }
    }
}

impl ScanConfig {
    /// Configuration for a pure geometric rectification: no enhancement.
    pub fn geometry_only() -> Self {
        Self {
            enhance: EnhanceConfig {
                mode: EnhanceMode::None,
                ..EnhanceConfig::default()
            },
            ..Self::default()
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations that cannot produce a meaningful result.
    pub fn validate(&self) -> Result<()> {
        let edges = &self.edges;
        if !(edges.blur_sigma > 0.0) {
            return Err(DocScanError::invalid("edges.blur_sigma must be positive"));
        }
        if !(edges.canny_low >= 0.0 && edges.canny_low <= edges.canny_high) {
            return Err(DocScanError::invalid(
                "edges.canny_low must be non-negative and not exceed edges.canny_high",
            ));
        }

        let det = &self.detector;
        if det.detection_max_side == Some(0) {
            return Err(DocScanError::invalid(
                "detector.detection_max_side must be positive",
            ));
        }
        if !(det.epsilon_ratio > 0.0 && det.epsilon_ratio < 1.0) {
            return Err(DocScanError::invalid(
                "detector.epsilon_ratio must lie in (0, 1)",
            ));
        }
        if !(det.min_area_ratio >= 0.0
            && det.min_area_ratio < det.max_area_ratio
            && det.max_area_ratio <= 1.0)
        {
            return Err(DocScanError::invalid(
                "detector area ratios must satisfy 0 <= min < max <= 1",
            ));
        }

        if self.warp.min_output_side == 0 {
            return Err(DocScanError::invalid("warp.min_output_side must be at least 1"));
        }

        if !(self.enhance.contrast_factor > 0.0) {
            return Err(DocScanError::invalid(
                "enhance.contrast_factor must be positive",
            ));
        }
        Ok(())
    }
}
