// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people holding a phone over a piece of
// paper.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives how the front end presents it.

use crate::error::DocScanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something on the device hiccuped; trying again may work.
    Transient,
    /// The user must do something (retake the photo, move the corners).
    ActionRequired,
    /// Retrying with the same input will never work.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same request could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `DocScanError` into a `HumanError`.
pub fn humanize_error(err: &DocScanError) -> HumanError {
    match err {
        DocScanError::NotFound => HumanError {
            message: "We couldn't find the edges of the page.".into(),
            suggestion: "Drag the four corners onto the corners of your document, or retake the photo against a darker background.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        DocScanError::InvalidInput(detail) => {
            if detail.contains("corner") {
                HumanError {
                    message: "The page corners don't look right.".into(),
                    suggestion: format!("Place exactly four corners inside the photo, then try again. ({detail})"),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "This photo can't be scanned.".into(),
                    suggestion: format!("Try taking the photo again. ({detail})"),
                    retriable: false,
                    severity: Severity::Permanent,
                }
            }
        }

        DocScanError::Degenerate(_) => HumanError {
            message: "Those corners don't make a page shape.".into(),
            suggestion: "Spread the corners out so they sit on the four corners of the document, with no two on top of each other or in a straight line.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        DocScanError::DecodeFailure(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        DocScanError::EncodeFailure(_) => HumanError {
            message: "The scanned page couldn't be saved.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DocScanError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The photo couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try taking or choosing the photo again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or try copying the photo to a different location first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        DocScanError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_asks_for_manual_corners() {
        let human = humanize_error(&DocScanError::NotFound);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
        assert!(human.suggestion.contains("corners"));
    }

    #[test]
    fn corner_count_is_action_required() {
        let err = DocScanError::invalid("expected 4 corners, got 3");
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("got 3"));
    }

    #[test]
    fn empty_image_is_permanent() {
        let err = DocScanError::invalid("image has zero width or height");
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = DocScanError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn encode_failure_is_transient() {
        let human = humanize_error(&DocScanError::EncodeFailure("png".into()));
        assert!(human.retriable);
        assert_eq!(human.severity, Severity::Transient);
    }
}
