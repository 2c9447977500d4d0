// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docscan.

use thiserror::Error;

/// Top-level error type for all docscan operations.
#[derive(Debug, Error)]
pub enum DocScanError {
    // -- Pipeline errors --
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no document found")]
    NotFound,

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    // -- Boundary errors --
    #[error("failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("failed to encode image: {0}")]
    EncodeFailure(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`DocScanError`], used by boundary layers to
/// choose error codes without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Degenerate,
    DecodeFailure,
    Boundary,
}

impl DocScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound => ErrorKind::NotFound,
            Self::Degenerate(_) => ErrorKind::Degenerate,
            Self::DecodeFailure(_) => ErrorKind::DecodeFailure,
            Self::EncodeFailure(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Boundary,
        }
    }

    /// Shorthand for building an [`DocScanError::InvalidInput`].
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidInput(detail.into())
    }

    /// Shorthand for building a [`DocScanError::Degenerate`].
    pub fn degenerate(detail: impl Into<String>) -> Self {
        Self::Degenerate(detail.into())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocScanError>;
