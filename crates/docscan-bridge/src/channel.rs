// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Method channel — the four scanner methods as typed calls, their replies, and
// the error codes the mobile front end switches on.

use std::fmt;

use docscan_core::error::{DocScanError, Result as CoreResult};
use docscan_core::{CornerSource, DetectionPreview, ErrorKind, Point2D};
use docscan_document::{DocumentScanner, ScanResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::traits::MethodHandler;

// -- Error codes --------------------------------------------------------------

/// Error codes reported to the front end.
///
/// [`ErrorCode::as_str`] is the only spelling; serde goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum ErrorCode {
    /// Missing or malformed arguments, undecodable images, bad corners.
    InvalidData,
    DetectError,
    ScanError,
    ProcessingError,
    CropError,
    /// Unknown method name.
    NotImplemented,
}

impl ErrorCode {
    pub const ALL: [Self; 6] = [
        Self::InvalidData,
        Self::DetectError,
        Self::ScanError,
        Self::ProcessingError,
        Self::CropError,
        Self::NotImplemented,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidData => "INVALID_DATA",
            Self::DetectError => "DETECT_ERROR",
            Self::ScanError => "SCAN_ERROR",
            Self::ProcessingError => "PROCESSING_ERROR",
            Self::CropError => "CROP_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl From<ErrorCode> for &'static str {
    fn from(code: ErrorCode) -> Self {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == value)
            .ok_or_else(|| format!("unknown error code `{value}`"))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call as the channel reports it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ChannelError {
    pub code: ErrorCode,
    pub message: String,
}

impl ChannelError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidData, message)
    }

    pub fn not_implemented(method: &str) -> Self {
        Self::new(
            ErrorCode::NotImplemented,
            format!("method `{method}` is not implemented"),
        )
    }

    /// Map a pipeline failure raised while serving a method whose own failure
    /// code is `method_code`. Bad input is always `INVALID_DATA`.
    pub fn from_scan(method_code: ErrorCode, err: &DocScanError) -> Self {
        let code = match err.kind() {
            ErrorKind::InvalidInput | ErrorKind::DecodeFailure => ErrorCode::InvalidData,
            ErrorKind::NotFound | ErrorKind::Degenerate | ErrorKind::Boundary => method_code,
        };
        Self::new(code, err.to_string())
    }
}

// -- Calls --------------------------------------------------------------------

pub const DETECT_DOCUMENT: &str = "detectDocument";
pub const SCAN_DOCUMENT: &str = "scanDocument";
pub const PROCESS_WITH_CORNERS: &str = "processWithCorners";
pub const CROP_DOCUMENT: &str = "cropDocument";

/// A decoded method call.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodCall {
    DetectDocument {
        image_bytes: Vec<u8>,
    },
    ScanDocument {
        image_bytes: Vec<u8>,
    },
    ProcessWithCorners {
        image_bytes: Vec<u8>,
        corners: Vec<Point2D>,
    },
    CropDocument {
        image_bytes: Vec<u8>,
        corners: Vec<Point2D>,
    },
}

/// Wire shape of the call arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArguments {
    image_bytes: Option<Vec<u8>>,
    corners: Option<Vec<Vec<f64>>>,
}

impl RawArguments {
    fn from_value(value: &Value) -> Result<Self, ChannelError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
            .map_err(|err| ChannelError::invalid_data(format!("malformed arguments: {err}")))
    }

    fn image_bytes(&mut self) -> Result<Vec<u8>, ChannelError> {
        match self.image_bytes.take() {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            Some(_) => Err(ChannelError::invalid_data("Image bytes are empty")),
            None => Err(ChannelError::invalid_data("Image bytes are null")),
        }
    }

    fn corners(&mut self) -> Result<Vec<Point2D>, ChannelError> {
        let raw = self
            .corners
            .take()
            .ok_or_else(|| ChannelError::invalid_data("Missing required parameters"))?;
        raw.into_iter()
            .map(|pair| match pair.as_slice() {
                [x, y] => Ok(Point2D::new(*x, *y)),
                other => Err(ChannelError::invalid_data(format!(
                    "corner must be an [x, y] pair, got {} values",
                    other.len()
                ))),
            })
            .collect()
    }
}

impl MethodCall {
    /// Decode a call from its method name and JSON argument map.
    ///
    /// Unknown methods are `NOT_IMPLEMENTED`; missing or malformed arguments
    /// are `INVALID_DATA`. Corner counts are checked by the scanner.
    pub fn parse(method: &str, arguments: &Value) -> Result<Self, ChannelError> {
        let call = match method {
            DETECT_DOCUMENT => Self::DetectDocument {
                image_bytes: RawArguments::from_value(arguments)?.image_bytes()?,
            },
            SCAN_DOCUMENT => Self::ScanDocument {
                image_bytes: RawArguments::from_value(arguments)?.image_bytes()?,
            },
            PROCESS_WITH_CORNERS => {
                let mut args = RawArguments::from_value(arguments)?;
                Self::ProcessWithCorners {
                    image_bytes: args.image_bytes()?,
                    corners: args.corners()?,
                }
            }
            CROP_DOCUMENT => {
                let mut args = RawArguments::from_value(arguments)?;
                Self::CropDocument {
                    image_bytes: args.image_bytes()?,
                    corners: args.corners()?,
                }
            }
            other => return Err(ChannelError::not_implemented(other)),
        };
        debug!(method, "Method call decoded");
        Ok(call)
    }

    /// Decode a call whose arguments arrive as a JSON string.
    pub fn from_json(method: &str, arguments: &str) -> Result<Self, ChannelError> {
        let value: Value = serde_json::from_str(arguments)
            .map_err(|err| ChannelError::invalid_data(format!("arguments are not JSON: {err}")))?;
        Self::parse(method, &value)
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            Self::DetectDocument { .. } => DETECT_DOCUMENT,
            Self::ScanDocument { .. } => SCAN_DOCUMENT,
            Self::ProcessWithCorners { .. } => PROCESS_WITH_CORNERS,
            Self::CropDocument { .. } => CROP_DOCUMENT,
        }
    }

    /// The code reported when this call fails inside the pipeline.
    pub fn failure_code(&self) -> ErrorCode {
        match self {
            Self::DetectDocument { .. } => ErrorCode::DetectError,
            Self::ScanDocument { .. } => ErrorCode::ScanError,
            Self::ProcessWithCorners { .. } => ErrorCode::ProcessingError,
            Self::CropDocument { .. } => ErrorCode::CropError,
        }
    }
}

// -- Replies ------------------------------------------------------------------

/// How rectified images are encoded for the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg {
        quality: u8,
    },
}

/// An encoded output image and the geometry that produced it.
///
/// `bytes` serializes as a base64 string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedImage {
    #[serde(serialize_with = "as_base64")]
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Corners that were rectified, in source pixel coordinates.
    pub corners: [[f64; 2]; 4],
    pub source: CornerSource,
}

fn as_base64<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodReply {
    Detection(DetectionPreview),
    Image(EncodedImage),
}

impl MethodReply {
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            Self::Detection(preview) => serde_json::to_value(preview),
            Self::Image(image) => serde_json::to_value(image),
        }
    }
}

// -- Handler ------------------------------------------------------------------

/// Serves method calls with a [`DocumentScanner`].
#[derive(Debug, Clone, Default)]
pub struct ScanChannel {
    scanner: DocumentScanner,
    format: OutputFormat,
}

impl ScanChannel {
    pub fn new(scanner: DocumentScanner, format: OutputFormat) -> Self {
        Self { scanner, format }
    }

    pub fn scanner(&self) -> &DocumentScanner {
        &self.scanner
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn encode(&self, result: ScanResult) -> CoreResult<MethodReply> {
        let size = result.size();
        let corners = result.quad.to_pairs();
        let source = result.source;
        let raster = result.into_raster();
        let bytes = match self.format {
            OutputFormat::Png => raster.to_png_bytes()?,
            OutputFormat::Jpeg { quality } => raster.to_jpeg_bytes(quality)?,
        };
        Ok(MethodReply::Image(EncodedImage {
            bytes,
            format: self.format,
            width: size.width,
            height: size.height,
            corners,
            source,
        }))
    }
}

impl MethodHandler for ScanChannel {
    #[instrument(skip_all, fields(method = call.method_name()))]
    fn handle(&self, call: &MethodCall) -> Result<MethodReply, ChannelError> {
        let outcome = match call {
            MethodCall::DetectDocument { image_bytes } => self
                .scanner
                .detect_document_bytes(image_bytes)
                .map(MethodReply::Detection),
            MethodCall::ScanDocument { image_bytes } => self
                .scanner
                .scan_document_bytes(image_bytes)
                .and_then(|r| self.encode(r)),
            MethodCall::ProcessWithCorners {
                image_bytes,
                corners,
            } => self
                .scanner
                .process_with_corners_bytes(image_bytes, corners)
                .and_then(|r| self.encode(r)),
            MethodCall::CropDocument {
                image_bytes,
                corners,
            } => self
                .scanner
                .crop_document_bytes(image_bytes, corners)
                .and_then(|r| self.encode(r)),
        };
        outcome.map_err(|err| {
            warn!(error = %err, "Method failed");
            ChannelError::from_scan(call.failure_code(), &err)
        })
    }
}

/// Decode and serve one call in a single step.
pub fn dispatch<H>(handler: &H, method: &str, arguments: &Value) -> Result<MethodReply, ChannelError>
where
    H: MethodHandler + ?Sized,
{
    let call = MethodCall::parse(method, arguments)?;
    handler.handle(&call)
}
