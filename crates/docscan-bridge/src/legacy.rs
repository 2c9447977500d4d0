// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Legacy string results and file staging.
//
// Older front ends exchange file paths rather than bytes: the input photo is
// staged to disk, results are written next to it, and failures come back as
// a string starting with "Error:" (or a JSON object with an "error" key for
// detection). This is the only module in the workspace that touches the
// filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use docscan_core::error::Result;
use docscan_core::{DetectionPreview, Point2D};
use docscan_document::{DocumentScanner, Raster, ScanResult};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

/// Prefix marking a failed string result.
pub const ERROR_PREFIX: &str = "Error:";

/// File name the staged input photo is written to.
pub const STAGED_INPUT: &str = "temp_input.jpg";

/// File name for scan and process results, next to the input.
pub const SCANNED_OUTPUT: &str = "scanned_output.jpg";

/// JPEG quality for scan and process results.
pub const PROCESSED_JPEG_QUALITY: u8 = 95;

/// JPEG quality for crops, which keep every detail of the page.
pub const CROPPED_JPEG_QUALITY: u8 = 100;

// -- String convention --------------------------------------------------------

/// Render a path result as the legacy string: the path, or `"Error: <msg>"`.
pub fn render(result: &Result<PathBuf>) -> String {
    match result {
        Ok(path) => path.display().to_string(),
        Err(err) => format!("{ERROR_PREFIX} {err}"),
    }
}

/// Reverse of [`render`]: a path, or the error message without its prefix.
pub fn parse(reply: &str) -> std::result::Result<PathBuf, String> {
    match reply.strip_prefix(ERROR_PREFIX) {
        Some(message) => Err(message.trim_start().to_string()),
        None => Ok(PathBuf::from(reply)),
    }
}

/// Render a JSON result: the serialized value, or `{"error": "<msg>"}`.
pub fn render_json<T: Serialize>(result: &Result<T>) -> String {
    let value = match result {
        Ok(value) => serde_json::to_value(value),
        Err(err) => Ok(json!({ "error": err.to_string() })),
    };
    match value {
        Ok(value) => value.to_string(),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

// -- File staging -------------------------------------------------------------

/// Write encoded photo bytes to `dir/temp_input.jpg`, creating `dir` if
/// needed.
pub fn stage_input(dir: &Path, image_bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(STAGED_INPUT);
    fs::write(&path, image_bytes)?;
    Ok(path)
}

/// `scanned_output.jpg` in the input's directory.
pub fn scanned_output_path(input: &Path) -> PathBuf {
    input.with_file_name(SCANNED_OUTPUT)
}

/// `<stem>_cropped.jpg` in the input's directory.
pub fn cropped_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{stem}_cropped.jpg"))
}

#[instrument(skip(scanner), fields(input = %input.display()))]
pub fn detect_file(scanner: &DocumentScanner, input: &Path) -> Result<DetectionPreview> {
    let image = Raster::open(input)?.into_dynamic();
    scanner.detect_document_preview(&image)
}

#[instrument(skip(scanner), fields(input = %input.display()))]
pub fn scan_file(scanner: &DocumentScanner, input: &Path) -> Result<PathBuf> {
    let image = Raster::open(input)?.into_dynamic();
    let result = scanner.scan_document(&image)?;
    write_jpeg(result, scanned_output_path(input), PROCESSED_JPEG_QUALITY)
}

#[instrument(skip(scanner, corners), fields(input = %input.display()))]
pub fn process_file(
    scanner: &DocumentScanner,
    input: &Path,
    corners: &[Point2D],
) -> Result<PathBuf> {
    let image = Raster::open(input)?.into_dynamic();
    let result = scanner.process_with_corners(&image, corners)?;
    write_jpeg(result, scanned_output_path(input), PROCESSED_JPEG_QUALITY)
}

#[instrument(skip(scanner, corners), fields(input = %input.display()))]
pub fn crop_file(scanner: &DocumentScanner, input: &Path, corners: &[Point2D]) -> Result<PathBuf> {
    let image = Raster::open(input)?.into_dynamic();
    let result = scanner.crop_document(&image, corners)?;
    write_jpeg(result, cropped_output_path(input), CROPPED_JPEG_QUALITY)
}

fn write_jpeg(result: ScanResult, path: PathBuf, quality: u8) -> Result<PathBuf> {
    let bytes = result.into_raster().to_jpeg_bytes(quality)?;
    fs::write(&path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "Result written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{page_png, uniform_png};
    use docscan_core::DocScanError;

    fn page_corners() -> [Point2D; 4] {
        [
            Point2D::new(30.0, 40.0),
            Point2D::new(170.0, 40.0),
            Point2D::new(170.0, 220.0),
            Point2D::new(30.0, 220.0),
        ]
    }

    #[test]
    fn render_and_parse_round_trip() {
        let ok: Result<PathBuf> = Ok(PathBuf::from("/data/images/scanned_output.jpg"));
        let rendered = render(&ok);
        assert_eq!(rendered, "/data/images/scanned_output.jpg");
        assert_eq!(parse(&rendered), Ok(PathBuf::from(&rendered)));

        let failed: Result<PathBuf> = Err(DocScanError::NotFound);
        let rendered = render(&failed);
        assert_eq!(rendered, "Error: no document found");
        assert_eq!(parse(&rendered), Err("no document found".to_string()));
    }

    #[test]
    fn json_errors_use_an_error_key() {
        let failed: Result<DetectionPreview> = Err(DocScanError::invalid("bad corners"));
        let v: serde_json::Value = serde_json::from_str(&render_json(&failed)).expect("json");
        assert_eq!(v["error"], "invalid input: bad corners");
    }

    #[test]
    fn output_paths_sit_next_to_the_input() {
        let input = Path::new("/tmp/images/temp_input.jpg");
        assert_eq!(
            scanned_output_path(input),
            PathBuf::from("/tmp/images/scanned_output.jpg")
        );
        assert_eq!(
            cropped_output_path(input),
            PathBuf::from("/tmp/images/temp_input_cropped.jpg")
        );
    }

    #[test]
    fn staged_files_are_processed_and_cropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = dir.path().join("images");
        let input = stage_input(&images, &page_png()).expect("stage");
        assert_eq!(input, images.join(STAGED_INPUT));

        let scanner = DocumentScanner::default();

        let processed = process_file(&scanner, &input, &page_corners()).expect("process");
        assert_eq!(processed, images.join(SCANNED_OUTPUT));
        let written = fs::read(&processed).expect("read");
        assert_eq!(&written[..2], &[0xFF, 0xD8]);

        let cropped = crop_file(&scanner, &input, &page_corners()).expect("crop");
        assert_eq!(cropped, images.join("temp_input_cropped.jpg"));
        let back = Raster::open(&cropped).expect("decode");
        assert_eq!((back.width(), back.height()), (140, 180));
    }

    #[test]
    fn staged_scan_and_detect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = stage_input(dir.path(), &page_png()).expect("stage");
        let scanner = DocumentScanner::default();

        let preview = detect_file(&scanner, &input).expect("detect");
        assert_eq!(preview.preview_size.width, 200);
        assert!(render_json(&Ok(preview)).contains("\"ratio\""));

        let out = scan_file(&scanner, &input).expect("scan");
        assert!(out.ends_with(SCANNED_OUTPUT));
        assert!(out.exists());
    }

    #[test]
    fn failures_render_with_the_error_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = stage_input(dir.path(), &uniform_png()).expect("stage");
        let scanner = DocumentScanner::default();

        let rendered = render(&crop_file(&scanner, &input, &page_corners()[..3]));
        assert!(rendered.starts_with(ERROR_PREFIX), "{rendered}");

        let missing = dir.path().join("missing.jpg");
        let rendered = render(&scan_file(&scanner, &missing));
        assert!(rendered.starts_with("Error: file I/O error"), "{rendered}");
    }
}
